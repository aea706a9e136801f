//! Synthetic workbook builder shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const WORKSHEET_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
pub const SHARED_STRINGS_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";

/// In-memory XLSX builder: collects parts and zips them in insertion order.
#[derive(Default)]
pub struct Fixture {
    files: Vec<(String, Vec<u8>)>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.to_string(), content.into()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.build_with(CompressionMethod::Deflated)
    }

    /// Build with every entry stored uncompressed, so tests can patch bytes.
    pub fn build_stored(self) -> Vec<u8> {
        self.build_with(CompressionMethod::Stored)
    }

    fn build_with(self, method: CompressionMethod) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = SimpleFileOptions::default().compression_method(method);

        for (name, content) in self.files {
            zip.start_file(name, options).unwrap();
            zip.write_all(&content).unwrap();
        }

        zip.finish().unwrap();
        buffer
    }
}

/// `[Content_Types].xml` declaring the given worksheets and shared strings.
pub fn content_types(worksheets: &[&str], shared_strings: Option<&str>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    for part in worksheets {
        xml.push_str(&format!(
            "\n  <Override PartName=\"{}\" ContentType=\"{}\"/>",
            part, WORKSHEET_TYPE
        ));
    }
    if let Some(part) = shared_strings {
        xml.push_str(&format!(
            "\n  <Override PartName=\"{}\" ContentType=\"{}\"/>",
            part, SHARED_STRINGS_TYPE
        ));
    }
    xml.push_str("\n</Types>");
    xml
}

/// `xl/workbook.xml` declaring `(name, sheetId)` pairs.
pub fn workbook(sheets: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>"#,
    );
    for (i, (name, id)) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            "\n    <sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            name,
            id,
            i + 1
        ));
    }
    xml.push_str("\n  </sheets>\n</workbook>");
    xml
}

/// `xl/_rels/workbook.xml.rels` pointing `rId{n}` at the given targets.
pub fn workbook_rels(targets: &[&str]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, target) in targets.iter().enumerate() {
        xml.push_str(&format!(
            "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"{}\"/>",
            i + 1,
            target
        ));
    }
    xml.push_str("\n</Relationships>");
    xml
}

/// `xl/sharedStrings.xml`; `None` entries are written as `<t/>`.
pub fn shared_strings(entries: &[Option<&str>]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        entries.len()
    );
    for entry in entries {
        match entry {
            Some(text) => xml.push_str(&format!("<si><t>{}</t></si>", text)),
            None => xml.push_str("<si><t/></si>"),
        }
    }
    xml.push_str("</sst>");
    xml
}

/// Worksheet XML wrapping raw `<row>` markup.
pub fn worksheet(rows: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:E3"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetData>{}</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
        rows
    )
}

/// The two-sheet workbook used throughout the tests.
///
/// Sheet one mixes shared strings (header row) with numeric cells; sheet two
/// reuses the pool for its header.
pub fn sample_workbook() -> Vec<u8> {
    let sheet1 = worksheet(
        r#"<row r="1" spans="1:5"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c><c r="D1" t="s"><v>3</v></c><c r="E1" t="s"><v>4</v></c></row><row r="2" spans="1:5"><c r="A2" s="1"><v>43922</v></c><c r="B2"><v>1</v></c><c r="C2"><v>2</v></c><c r="D2"><v>3</v></c><c r="E2"><v>4</v></c></row><row r="3" spans="1:5"><c r="A3" s="1"><v>43923</v></c><c r="B3"><v>5</v></c><c r="C3"><v>6</v></c><c r="D3"><v>7</v></c><c r="E3"><v>8</v></c></row>"#,
    );
    let sheet2 = worksheet(
        r#"<row r="1" spans="1:4"><c r="A1" t="s"><v>1</v></c><c r="B1" t="s"><v>2</v></c><c r="C1" t="s"><v>3</v></c><c r="D1" t="s"><v>4</v></c></row><row r="2" spans="1:4"><c r="A2"><v>1</v></c><c r="B2"><v>2</v></c><c r="C2"><v>3</v></c><c r="D2"><v>4</v></c></row><row r="3" spans="1:4"><c r="A3"><v>5</v></c><c r="B3"><v>6</v></c><c r="C3"><v>7</v></c><c r="D3"><v>8</v></c></row>"#,
    );

    Fixture::new()
        .part(
            "[Content_Types].xml",
            content_types(
                &["/xl/worksheets/sheet1.xml", "/xl/worksheets/sheet2.xml"],
                Some("/xl/sharedStrings.xml"),
            ),
        )
        .part("xl/workbook.xml", workbook(&[("sheet1", "1"), ("sheet2", "2")]))
        .part(
            "xl/_rels/workbook.xml.rels",
            workbook_rels(&["worksheets/sheet1.xml", "worksheets/sheet2.xml"]),
        )
        .part(
            "xl/sharedStrings.xml",
            shared_strings(&[Some("Date"), Some("A"), Some("B"), Some("C"), Some("D")]),
        )
        .part("xl/worksheets/sheet1.xml", sheet1)
        .part("xl/worksheets/sheet2.xml", sheet2)
        .build()
}
