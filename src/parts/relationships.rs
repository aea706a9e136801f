//! Package relationship (`.rels`) parsing.

use crate::error::Result;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

const WORKSHEET_REL_SUFFIX: &str = "/relationships/worksheet";

/// A relationship entry from a .rels file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative or absolute)
    pub target: String,
    /// Whether the target is external
    pub external: bool,
}

impl Relationship {
    /// Whether the target is a worksheet part, under either the transitional
    /// or the strict relationship namespace.
    pub fn is_worksheet(&self) -> bool {
        self.rel_type.ends_with(WORKSHEET_REL_SUFFIX)
    }
}

/// Relationships declared by one part, keyed by relationship ID.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse relationships from XML text.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    /// Parse relationships from a buffered reader.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut rels = Relationships::new();
        let mut reader = quick_xml::Reader::from_reader(source);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = String::new();
                    let mut rel_type = String::new();
                    let mut target = String::new();
                    let mut external = false;

                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Id" => id = attr.unescape_value()?.into_owned(),
                            b"Type" => rel_type = attr.unescape_value()?.into_owned(),
                            b"Target" => target = attr.unescape_value()?.into_owned(),
                            b"TargetMode" => {
                                external = attr.value.eq_ignore_ascii_case(b"external")
                            }
                            _ => {}
                        }
                    }

                    if !id.is_empty() {
                        rels.add(Relationship {
                            id,
                            rel_type,
                            target,
                            external,
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Get a relationship by ID.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// Add a relationship, replacing any earlier one with the same ID.
    pub fn add(&mut self, rel: Relationship) {
        self.by_id.insert(rel.id.clone(), rel);
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Build the `.rels` entry name that belongs to a part.
///
/// `xl/workbook.xml` maps to `xl/_rels/workbook.xml.rels`.
pub fn rels_part_for(part_path: &str) -> String {
    let path = Path::new(part_path);
    let filename = path.file_name().unwrap_or_default().to_string_lossy();
    match path.parent().map(|p| p.to_string_lossy()) {
        Some(parent) if !parent.is_empty() => format!("{}/_rels/{}.rels", parent, filename),
        _ => format!("_rels/{}.rels", filename),
    }
}
