//! `[Content_Types].xml` scanning.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;

/// Archive entry holding the content-type declarations.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const OVERRIDE: &[u8] = b"Override";
const PART_NAME: &str = "PartName";
const CONTENT_TYPE: &[u8] = b"ContentType";

const WORKSHEET_CONTENT_TYPE: &[u8] =
    b"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const SHARED_STRINGS_CONTENT_TYPE: &[u8] =
    b"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";

/// Worksheet and shared-string part names declared by the content types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartIndex {
    /// Shared-string part, if declared (last declaration wins)
    pub shared_strings: Option<String>,
    /// Worksheet parts in document order
    pub worksheets: Vec<String>,
}

impl PartIndex {
    /// Parse content types from XML text.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    /// Parse content types from a buffered reader.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut index = PartIndex::default();
        let mut reader = quick_xml::Reader::from_reader(source);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e)
                    if e.local_name().as_ref() == OVERRIDE =>
                {
                    if let Some(content_type) = e.try_get_attribute(CONTENT_TYPE)? {
                        match content_type.value.as_ref() {
                            WORKSHEET_CONTENT_TYPE => index.worksheets.push(part_name(e)?),
                            SHARED_STRINGS_CONTENT_TYPE => {
                                index.shared_strings = Some(part_name(e)?)
                            }
                            _ => {}
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if index.worksheets.is_empty() {
            return Err(Error::NoWorksheets);
        }

        log::debug!(
            "content types declare {} worksheet(s), shared strings: {:?}",
            index.worksheets.len(),
            index.shared_strings
        );

        Ok(index)
    }
}

fn part_name(e: &BytesStart<'_>) -> Result<String> {
    let value = match e.try_get_attribute(PART_NAME)? {
        Some(attr) => attr.unescape_value()?.into_owned(),
        None => String::new(),
    };

    if value.is_empty() {
        return Err(Error::MalformedPart {
            part: CONTENT_TYPES_PART.to_string(),
            attribute: PART_NAME,
        });
    }

    Ok(value)
}
