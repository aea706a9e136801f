//! Parsers for the workbook-level XML parts.
//!
//! Each parser makes a single forward pass over a part with `quick-xml` and
//! returns an owned index that the container assembler consumes.

mod content_types;
mod relationships;
mod shared_strings;
mod workbook;

pub use content_types::{PartIndex, CONTENT_TYPES_PART};
pub use relationships::{rels_part_for, Relationship, Relationships};
pub use shared_strings::SharedStrings;
pub use workbook::{SheetEntry, WorkbookRegistry, DEFAULT_WORKBOOK_PART};
