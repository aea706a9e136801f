//! Error types for the unsheet library.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for unsheet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening a workbook or decoding its sheets.
///
/// Cloning is cheap: I/O errors are shared behind an `Arc`, so a decoder can
/// hand its terminal error to the caller and still report it afterwards.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// I/O error while reading the input source or an archive entry.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The input is not a readable ZIP archive.
    #[error("Cannot open container: {0}")]
    ContainerOpen(String),

    /// A content-type declaration lacks a required attribute.
    #[error("Malformed part {part}: missing {attribute} attribute")]
    MalformedPart {
        /// Part being scanned
        part: String,
        /// Name of the missing attribute
        attribute: &'static str,
    },

    /// A workbook sheet declaration lacks a required attribute.
    #[error("Malformed workbook: sheet element missing {attribute} attribute")]
    MalformedWorkbook {
        /// Name of the missing attribute
        attribute: &'static str,
    },

    /// A declared part has no matching archive entry.
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// The content types declare no worksheet parts.
    #[error("No worksheet parts declared")]
    NoWorksheets,

    /// The XML token stream failed before a clean end of input.
    #[error("XML token stream error: {0}")]
    TokenStream(String),

    /// A cell references a shared string beyond the end of the table.
    #[error("Shared string index {index} out of range (table has {len} entries)")]
    OutOfRangeSharedIndex {
        /// Referenced index
        index: usize,
        /// Number of entries in the shared-string table
        len: usize,
    },

    /// A cell reference does not name a valid column.
    #[error("Invalid cell reference: {0:?}")]
    InvalidCellReference(String),

    /// A shared-string cell value is not a non-negative integer.
    #[error("Invalid shared string index: {0:?}")]
    InvalidSharedIndex(String),

    /// The container or stream has already been closed.
    #[error("Stream closed")]
    StreamClosed,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ContainerOpen(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            // failures of the underlying entry stream (inflate, checksum)
            quick_xml::Error::Io(io) => Error::Io(io),
            other => Error::TokenStream(other.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::TokenStream(err.to_string())
    }
}
