//! Workbook sheet registry.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::BufRead;

/// Conventional location of the workbook part.
pub const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

const SHEET: &[u8] = b"sheet";
const SHEET_ID: &str = "sheetId";
const SHEET_NAME: &str = "name";

/// A `<sheet>` declaration from the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// Internal sheet identifier (`sheetId`)
    pub sheet_id: String,
    /// Display name
    pub name: String,
    /// Relationship ID pointing at the worksheet part, if declared
    pub rel_id: Option<String>,
}

/// Sheet identifiers mapped to their display names.
#[derive(Debug, Clone, Default)]
pub struct WorkbookRegistry {
    by_id: HashMap<String, SheetEntry>,
}

impl WorkbookRegistry {
    /// Parse the registry from XML text.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    /// Parse the registry from a buffered reader.
    ///
    /// The first `<sheet>` lacking `sheetId` or `name` aborts the whole build.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut registry = WorkbookRegistry::default();
        let mut reader = quick_xml::Reader::from_reader(source);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == SHEET => {
                    let entry = sheet_entry(e)?;
                    registry.by_id.insert(entry.sheet_id.clone(), entry);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(registry)
    }

    /// Display name for a sheet identifier.
    pub fn name(&self, sheet_id: &str) -> Option<&str> {
        self.by_id.get(sheet_id).map(|entry| entry.name.as_str())
    }

    /// Iterate over the declared sheets, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &SheetEntry> {
        self.by_id.values()
    }

    /// Whether any sheet carries a relationship ID.
    pub fn has_relationships(&self) -> bool {
        self.by_id.values().any(|entry| entry.rel_id.is_some())
    }

    /// Number of declared sheets.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn sheet_entry(e: &BytesStart<'_>) -> Result<SheetEntry> {
    let mut sheet_id = None;
    let mut name = None;
    let mut rel_id = None;

    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key;
        match key.as_ref() {
            b"sheetId" => sheet_id = Some(attr.unescape_value()?.into_owned()),
            b"name" => name = Some(attr.unescape_value()?.into_owned()),
            // r:id, whatever the relationships namespace prefix is
            _ if key.prefix().is_some() && key.local_name().as_ref() == b"id" => {
                rel_id = Some(attr.unescape_value()?.into_owned())
            }
            _ => {}
        }
    }

    let sheet_id = sheet_id.ok_or(Error::MalformedWorkbook {
        attribute: SHEET_ID,
    })?;
    let name = name.ok_or(Error::MalformedWorkbook {
        attribute: SHEET_NAME,
    })?;

    Ok(SheetEntry {
        sheet_id,
        name,
        rel_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <bookViews><workbookView/></bookViews>
  <sheets>
    <sheet name="sheet1" sheetId="1" r:id="rId1"/>
    <sheet name="Q&amp;A" sheetId="4" r:id="rId2"/>
  </sheets>
</workbook>"#;

    #[test]
    fn test_parse_workbook() {
        let registry = WorkbookRegistry::parse(WORKBOOK).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name("1"), Some("sheet1"));
        assert_eq!(registry.name("4"), Some("Q&A"));
        assert_eq!(registry.name("2"), None);
        assert!(registry.has_relationships());
    }

    #[test]
    fn test_relationship_ids() {
        let registry = WorkbookRegistry::parse(WORKBOOK).unwrap();
        let mut rel_ids: Vec<_> = registry
            .entries()
            .filter_map(|entry| entry.rel_id.as_deref())
            .collect();
        rel_ids.sort_unstable();
        assert_eq!(rel_ids, vec!["rId1", "rId2"]);
    }

    #[test]
    fn test_missing_sheet_id_aborts() {
        let xml = r#"<workbook><sheets>
  <sheet name="ok" sheetId="1"/>
  <sheet name="broken"/>
  <sheet name="never" sheetId="3"/>
</sheets></workbook>"#;
        let err = WorkbookRegistry::parse(xml).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedWorkbook {
                attribute: "sheetId"
            }
        ));
    }

    #[test]
    fn test_missing_name_aborts() {
        let xml = r#"<workbook><sheets><sheet sheetId="1"/></sheets></workbook>"#;
        let err = WorkbookRegistry::parse(xml).unwrap_err();
        assert!(matches!(err, Error::MalformedWorkbook { attribute: "name" }));
    }

    #[test]
    fn test_without_relationship_ids() {
        let xml = r#"<workbook><sheets><sheet name="Data" sheetId="7"/></sheets></workbook>"#;
        let registry = WorkbookRegistry::parse(xml).unwrap();
        assert_eq!(registry.name("7"), Some("Data"));
        assert!(!registry.has_relationships());
    }

    #[test]
    fn test_sheets_container_not_mistaken_for_sheet() {
        let xml = r#"<workbook><sheets></sheets></workbook>"#;
        let registry = WorkbookRegistry::parse(xml).unwrap();
        assert!(registry.is_empty());
    }
}
