//! Streaming row decoder for worksheet XML.
//!
//! [`RowReader`] walks a worksheet's `<sheetData>` subtree one event at a time
//! and hands out one [`Row`] per `<row>` element. It never looks ahead past
//! the row it is assembling and never rewinds; to read a sheet again, open a
//! new reader from its [`Sheet`](crate::Sheet).
//!
//! ```text
//!            <row>             </row>
//!  Seeking ─────────► InRow ─────────► Seeking (row emitted)
//!     │                 │
//!     │ </sheetData>    │ token or stream error / bad cell
//!     │ or EOF          ▼
//!     └──────► Done   Failed
//! ```

use crate::archive::utf8_stream;
use crate::error::{Error, Result};
use crate::parts::SharedStrings;
use quick_xml::events::{BytesStart, Event};
use std::io::{BufRead, Cursor, Read};
use std::sync::Arc;

/// One decoded row: cell text indexed by column, gaps filled with `""`.
pub type Row = Vec<String>;

const ROW: &[u8] = b"row";
const CELL: &[u8] = b"c";
const VALUE: &[u8] = b"v";
const INLINE_TEXT: &[u8] = b"t";
const SHEET_DATA: &[u8] = b"sheetData";

/// Highest column index a cell reference may name (`XFD`).
const MAX_COLUMN: usize = 16_383;

/// How a cell's text is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    /// `t="s"`: the value is an index into the shared-string table
    SharedString,
    /// `t="inlineStr"`: the text lives in the cell's `<is>` element
    InlineString,
    /// Anything else: the `<v>` text as written
    Literal,
}

impl CellType {
    /// Map a `t` attribute value to a cell type.
    pub fn from_attribute(value: &[u8]) -> Self {
        match value {
            b"s" => CellType::SharedString,
            b"inlineStr" => CellType::InlineString,
            _ => CellType::Literal,
        }
    }
}

/// Position of a [`RowReader`] in its forward-only scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Between rows
    Seeking,
    /// Accumulating the cells of a row
    InRow,
    /// Cell data exhausted
    Done,
    /// Stopped on an error, see [`RowReader::error`]
    Failed,
}

/// Convert the column letters of a cell reference (`"AB12"`) to a 0-based
/// column index.
///
/// Returns `None` when the reference has no leading letters or names a
/// column past `XFD`.
pub fn column_index(reference: &str) -> Option<usize> {
    let letters = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase());

    let mut column = 0usize;
    let mut seen = false;
    for letter in letters {
        column = column * 26 + usize::from(letter - b'A' + 1);
        if column > MAX_COLUMN + 1 {
            return None;
        }
        seen = true;
    }

    seen.then(|| column - 1)
}

/// Resolve raw cell text to its final string.
pub fn resolve_cell(kind: CellType, text: String, shared: &SharedStrings) -> Result<String> {
    match kind {
        CellType::SharedString => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(String::new());
            }
            let index: usize = trimmed
                .parse()
                .map_err(|_| Error::InvalidSharedIndex(text.clone()))?;
            shared
                .get(index)
                .map(str::to_owned)
                .ok_or(Error::OutOfRangeSharedIndex {
                    index,
                    len: shared.len(),
                })
        }
        CellType::InlineString | CellType::Literal => Ok(text),
    }
}

#[derive(Debug)]
struct PendingCell {
    kind: CellType,
    column: usize,
    text: String,
}

/// Accumulates the cells of the row currently being decoded.
#[derive(Debug, Default)]
struct RowBuilder {
    cells: Row,
    cell: Option<PendingCell>,
    in_text: bool,
}

impl RowBuilder {
    fn begin_row(&mut self) {
        self.cells.clear();
        self.cell = None;
        self.in_text = false;
    }

    fn begin_cell(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let mut kind = CellType::Literal;
        let mut column = self.cells.len();

        for attr in e.attributes() {
            let attr = attr?;
            match attr.key.as_ref() {
                b"t" => kind = CellType::from_attribute(&attr.value),
                b"r" => {
                    let reference = attr.unescape_value()?;
                    column = column_index(&reference)
                        .ok_or_else(|| Error::InvalidCellReference(reference.into_owned()))?;
                }
                _ => {}
            }
        }

        self.cell = Some(PendingCell {
            kind,
            column,
            text: String::new(),
        });
        Ok(())
    }

    fn open_text(&mut self, name: &[u8]) {
        if let Some(cell) = &self.cell {
            self.in_text = match name {
                VALUE => true,
                INLINE_TEXT => cell.kind == CellType::InlineString,
                _ => self.in_text,
            };
        }
    }

    fn close_text(&mut self, name: &[u8]) {
        if matches!(name, VALUE | INLINE_TEXT) {
            self.in_text = false;
        }
    }

    fn push_text(&mut self, text: &str) {
        if let (true, Some(cell)) = (self.in_text, self.cell.as_mut()) {
            cell.text.push_str(text);
        }
    }

    fn end_cell(&mut self, shared: &SharedStrings) -> Result<()> {
        self.in_text = false;
        let Some(cell) = self.cell.take() else {
            return Ok(());
        };

        let value = resolve_cell(cell.kind, cell.text, shared)?;
        if cell.column < self.cells.len() {
            self.cells[cell.column] = value;
        } else {
            self.cells.resize(cell.column, String::new());
            self.cells.push(value);
        }
        Ok(())
    }

    fn finish(&mut self) -> Row {
        self.cell = None;
        self.in_text = false;
        std::mem::take(&mut self.cells)
    }
}

enum Step {
    Continue,
    Row,
    Done,
}

/// Forward-only reader over the rows of one worksheet.
///
/// Drive it with [`advance`](RowReader::advance) and read the current row with
/// [`row`](RowReader::row) or [`take_row`](RowReader::take_row). When
/// `advance` returns `false`, [`error`](RowReader::error) tells a clean end of
/// data apart from a failure. The reader also implements [`Iterator`].
///
/// The reader owns its worksheet stream and pulls bytes from it only as
/// rows are requested, so failures of the stream itself (a corrupt entry,
/// a bad checksum) surface through `error` after the rows before them.
/// Dropping or [closing](RowReader::close) the reader releases the stream.
pub struct RowReader {
    sheet: String,
    input: Option<Input>,
    buf: Vec<u8>,
    shared: Arc<SharedStrings>,
    state: DecoderState,
    builder: RowBuilder,
    current: Row,
    rows_read: usize,
    error: Option<Error>,
    error_yielded: bool,
    closed: bool,
}

enum Input {
    /// Not read yet; the encoding is sniffed on first advance
    Raw(Box<dyn Read + Send>),
    Xml(quick_xml::Reader<Box<dyn BufRead + Send>>),
}

impl RowReader {
    /// Create a reader over a worksheet byte stream.
    pub fn new(
        sheet: impl Into<String>,
        source: impl Read + Send + 'static,
        shared: Arc<SharedStrings>,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            input: Some(Input::Raw(Box::new(source))),
            buf: Vec::new(),
            shared,
            state: DecoderState::Seeking,
            builder: RowBuilder::default(),
            current: Row::new(),
            rows_read: 0,
            error: None,
            error_yielded: false,
            closed: false,
        }
    }

    /// Create a reader over worksheet XML text.
    pub fn from_xml(xml: &str, shared: Arc<SharedStrings>) -> Self {
        Self::new("", Cursor::new(xml.as_bytes().to_vec()), shared)
    }

    /// Advance to the next row.
    ///
    /// Returns `true` when a row is available through [`row`](Self::row).
    /// Once it returns `false` it keeps doing so.
    pub fn advance(&mut self) -> bool {
        if matches!(self.state, DecoderState::Done | DecoderState::Failed) {
            return false;
        }
        self.current.clear();

        if let Err(err) = self.prepare() {
            return self.fail(err);
        }

        loop {
            let Some(Input::Xml(xml)) = self.input.as_mut() else {
                return self.fail(Error::StreamClosed);
            };
            self.buf.clear();

            let step = match xml.read_event_into(&mut self.buf) {
                Ok(event) => Self::apply(&mut self.state, &mut self.builder, &self.shared, event),
                Err(err) => Err(err.into()),
            };

            match step {
                Ok(Step::Continue) => {}
                Ok(Step::Row) => {
                    self.current = self.builder.finish();
                    self.rows_read += 1;
                    log::trace!(
                        "sheet {:?}: row {} has {} cells",
                        self.sheet,
                        self.rows_read,
                        self.current.len()
                    );
                    return true;
                }
                Ok(Step::Done) => {
                    if self.state == DecoderState::InRow {
                        log::warn!(
                            "sheet {:?}: input ended inside a row; dropping it",
                            self.sheet
                        );
                    }
                    self.state = DecoderState::Done;
                    self.input = None;
                    log::debug!("sheet {:?}: decoded {} rows", self.sheet, self.rows_read);
                    return false;
                }
                Err(err) => return self.fail(err),
            }
        }
    }

    /// Sniff the encoding and start tokenizing, once.
    fn prepare(&mut self) -> Result<()> {
        if matches!(self.input, Some(Input::Raw(_))) {
            if let Some(Input::Raw(raw)) = self.input.take() {
                let source = utf8_stream(raw)?;
                self.input = Some(Input::Xml(quick_xml::Reader::from_reader(source)));
            }
        }
        Ok(())
    }

    fn apply(
        state: &mut DecoderState,
        builder: &mut RowBuilder,
        shared: &SharedStrings,
        event: Event<'_>,
    ) -> Result<Step> {
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                ROW => {
                    *state = DecoderState::InRow;
                    builder.begin_row();
                }
                CELL if *state == DecoderState::InRow => builder.begin_cell(&e)?,
                name => builder.open_text(name),
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                ROW => {
                    builder.begin_row();
                    *state = DecoderState::Seeking;
                    return Ok(Step::Row);
                }
                CELL if *state == DecoderState::InRow => {
                    builder.begin_cell(&e)?;
                    builder.end_cell(shared)?;
                }
                _ => {}
            },
            Event::Text(e) => {
                if builder.in_text {
                    builder.push_text(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if builder.in_text {
                    builder.push_text(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                ROW if *state == DecoderState::InRow => {
                    *state = DecoderState::Seeking;
                    return Ok(Step::Row);
                }
                CELL => builder.end_cell(shared)?,
                SHEET_DATA => return Ok(Step::Done),
                name => builder.close_text(name),
            },
            Event::Eof => return Ok(Step::Done),
            _ => {}
        }
        Ok(Step::Continue)
    }

    fn fail(&mut self, err: Error) -> bool {
        log::debug!("sheet {:?}: decoding stopped: {}", self.sheet, err);
        self.state = DecoderState::Failed;
        self.error = Some(err);
        self.input = None;
        false
    }

    /// The row produced by the last successful [`advance`](Self::advance).
    pub fn row(&self) -> &[String] {
        &self.current
    }

    /// Take ownership of the current row, leaving it empty.
    pub fn take_row(&mut self) -> Row {
        std::mem::take(&mut self.current)
    }

    /// The error that stopped decoding, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Current decoder state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Number of rows produced so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Release the worksheet stream.
    ///
    /// A reader closed before reaching the end reports
    /// [`Error::StreamClosed`] on its next advance. Closing twice fails with
    /// the same error.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::StreamClosed);
        }
        self.closed = true;
        self.input = None;
        Ok(())
    }
}

impl Iterator for RowReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return Some(Ok(self.take_row()));
        }
        if self.error_yielded {
            return None;
        }
        self.error_yielded = true;
        self.error.clone().map(Err)
    }
}

impl std::fmt::Debug for RowReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("sheet", &self.sheet)
            .field("state", &self.state)
            .field("rows_read", &self.rows_read)
            .finish()
    }
}
