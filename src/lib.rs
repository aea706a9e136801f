//! # unsheet
//!
//! Streaming extraction of raw cell text from XLSX spreadsheets.
//!
//! A workbook is opened once into a [`Container`], which resolves the
//! content types, the workbook's sheet names and the shared-string table.
//! Each [`Sheet`] then decodes its rows lazily, one row at a time, as plain
//! strings: no styles, no formulas, no number parsing.
//!
//! ## Quick Start
//!
//! ```no_run
//! let container = unsheet::open("data.xlsx")?;
//!
//! for sheet in container.sheets() {
//!     println!("== {}", sheet.name());
//!
//!     let mut rows = sheet.open()?;
//!     while rows.advance() {
//!         println!("{}", rows.row().join(","));
//!     }
//!     if let Some(err) = rows.error() {
//!         eprintln!("stopped early: {}", err);
//!     }
//!     rows.close()?;
//! }
//!
//! container.close()?;
//! # Ok::<(), unsheet::Error>(())
//! ```
//!
//! ## Iterator style
//!
//! ```no_run
//! let container = unsheet::open("data.xlsx")?;
//! let first = &container.sheets()[0];
//!
//! for row in first.open()? {
//!     let row = row?;
//!     println!("{:?}", row);
//! }
//! # Ok::<(), unsheet::Error>(())
//! ```

pub mod archive;
pub mod container;
pub mod decoder;
pub mod error;
pub mod options;
pub mod parts;

// Re-exports
pub use container::{Container, Sheet};
pub use decoder::{CellType, DecoderState, Row, RowReader};
pub use error::{Error, Result};
pub use options::{OpenOptions, SheetBinding};
pub use parts::SharedStrings;

use std::io::{Read, Seek};
use std::path::Path;

/// Open a workbook from a file path.
///
/// # Example
///
/// ```no_run
/// let container = unsheet::open("data.xlsx")?;
/// println!("Sheets: {:?}", container.sheet_names());
/// # Ok::<(), unsheet::Error>(())
/// ```
pub fn open(path: impl AsRef<Path>) -> Result<Container> {
    Container::open(path)
}

/// Open a workbook from a file path with options.
///
/// # Example
///
/// ```no_run
/// use unsheet::{OpenOptions, SheetBinding};
///
/// let options = OpenOptions::new().with_sheet_binding(SheetBinding::FileName);
/// let container = unsheet::open_with_options("data.xlsx", &options)?;
/// # Ok::<(), unsheet::Error>(())
/// ```
pub fn open_with_options(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Container> {
    Container::open_with_options(path, options)
}

/// Open a workbook from any seekable byte source.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("data.xlsx")?;
/// let container = unsheet::open_reader(std::io::Cursor::new(data))?;
/// # Ok::<(), unsheet::Error>(())
/// ```
pub fn open_reader<R: Read + Seek>(reader: R) -> Result<Container> {
    Container::from_reader(reader)
}
