//! ZIP archive access and part-name resolution.
//!
//! The archive bytes are held behind an `Arc` so that every sheet decoder can
//! own an [`EntryReader`] over its worksheet without borrowing the archive or
//! coordinating with other decoders. Stored and deflated entries are inflated
//! incrementally straight from those bytes and checked against their CRC-32
//! once fully read.

use crate::error::{Error, Result};
use flate2::read::DeflateDecoder;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::sync::Arc;
use zip::CompressionMethod;

type ZipReader = zip::ZipArchive<Cursor<Arc<[u8]>>>;

/// Compressed bytes of one entry, sliced out of the shared archive buffer.
type Window = io::Take<Cursor<Arc<[u8]>>>;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Text encoding detected from the first bytes of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le { bom: bool },
    Utf16Be { bom: bool },
}

impl TextEncoding {
    /// Sniff from up to four leading bytes.
    ///
    /// Without a BOM, ASCII markup encoded as UTF-16 leaves a NUL in every
    /// other byte; UTF-8 XML never contains NUL.
    fn sniff(head: &[u8]) -> Self {
        match head {
            [0xEF, 0xBB, 0xBF, ..] => TextEncoding::Utf8Bom,
            [0xFF, 0xFE, ..] => TextEncoding::Utf16Le { bom: true },
            [0xFE, 0xFF, ..] => TextEncoding::Utf16Be { bom: true },
            [_, 0, _, 0, ..] => TextEncoding::Utf16Le { bom: false },
            [0, _, 0, _, ..] => TextEncoding::Utf16Be { bom: false },
            _ => TextEncoding::Utf8,
        }
    }

    fn is_utf16(self) -> bool {
        matches!(
            self,
            TextEncoding::Utf16Le { .. } | TextEncoding::Utf16Be { .. }
        )
    }
}

/// Decode XML part bytes to UTF-8, handling UTF-8 and UTF-16 (LE/BE) input.
///
/// Invalid UTF-8 is replaced rather than rejected; malformed UTF-16 fails.
pub fn decode_xml_bytes(bytes: Vec<u8>) -> Result<String> {
    match TextEncoding::sniff(&bytes) {
        TextEncoding::Utf8 => Ok(utf8_lossy(bytes)),
        TextEncoding::Utf8Bom => Ok(utf8_lossy(bytes[UTF8_BOM.len()..].to_vec())),
        TextEncoding::Utf16Le { bom } => {
            let body = if bom { &bytes[2..] } else { &bytes[..] };
            decode_utf16(body, u16::from_le_bytes).map(declare_utf8)
        }
        TextEncoding::Utf16Be { bom } => {
            let body = if bom { &bytes[2..] } else { &bytes[..] };
            decode_utf16(body, u16::from_be_bytes).map(declare_utf8)
        }
    }
}

fn utf8_lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Point the XML declaration's `encoding` at UTF-8 after transcoding.
fn declare_utf8(text: String) -> String {
    const ENCODING: &str = "encoding=";

    if !text.starts_with("<?xml") {
        return text;
    }
    let Some(decl_end) = text.find("?>") else {
        return text;
    };
    let Some(attr) = text[..decl_end].find(ENCODING) else {
        return text;
    };

    let open = attr + ENCODING.len();
    let quote = match text.as_bytes().get(open) {
        Some(&q) if q == b'"' || q == b'\'' => q as char,
        _ => return text,
    };
    let Some(len) = text[open + 1..decl_end].find(quote) else {
        return text;
    };

    format!("{}UTF-8{}", &text[..open + 1], &text[open + 1 + len..])
}

/// Wrap an entry stream so that it yields UTF-8 text.
///
/// UTF-8 input (with its BOM dropped) streams through untouched. UTF-16
/// input has no streaming path: it is read to the end and transcoded.
pub fn utf8_stream(mut raw: Box<dyn Read + Send>) -> Result<Box<dyn BufRead + Send>> {
    let mut head = Vec::with_capacity(4);
    (&mut raw).take(4).read_to_end(&mut head)?;

    let encoding = TextEncoding::sniff(&head);
    if encoding.is_utf16() {
        let mut bytes = head;
        raw.read_to_end(&mut bytes)?;
        let text = decode_xml_bytes(bytes)?;
        return Ok(Box::new(Cursor::new(text.into_bytes())));
    }

    if encoding == TextEncoding::Utf8Bom {
        head.drain(..UTF8_BOM.len());
    }
    Ok(Box::new(BufReader::new(Cursor::new(head).chain(raw))))
}

/// Resolve a logical part name to an archive entry name.
///
/// Absolute names (`/xl/worksheets/sheet1.xml`) must match an entry exactly
/// once the leading separator is stripped. Relative names fall back to the
/// first entry, in archive order, that contains the name as a substring. That
/// fallback is best effort: when one entry name is contained in another the
/// earlier entry wins, even if it is not the intended part.
pub fn resolve_part<'a>(part: &str, entries: &'a [String]) -> Result<&'a str> {
    let found = match part.strip_prefix('/') {
        Some(absolute) => entries.iter().find(|entry| entry.as_str() == absolute),
        None => entries.iter().find(|entry| entry.contains(part)),
    };

    found
        .map(String::as_str)
        .ok_or_else(|| Error::PartNotFound(part.to_string()))
}

/// Resolve a relationship target against the part that declares it.
///
/// Archive names always use `/`, so this works on segments rather than
/// platform paths. `..` above the archive root is dropped.
pub fn resolve_path(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    segments.join("/")
}

/// Read-only view of a ZIP archive held in memory.
#[derive(Clone)]
pub struct Archive {
    data: Arc<[u8]>,
    zip: ZipReader,
    entries: Arc<[String]>,
}

impl Archive {
    /// Open an archive over in-memory bytes.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data = data.into();
        let zip = zip::ZipArchive::new(Cursor::new(Arc::clone(&data)))?;
        let entries = zip.file_names().map(String::from).collect();
        Ok(Self { data, zip, entries })
    }

    /// Entry names in archive order.
    pub fn entry_names(&self) -> &[String] {
        &self.entries
    }

    /// Check if an entry with this exact name exists.
    pub fn exists(&self, entry: &str) -> bool {
        self.entries.iter().any(|n| n == entry)
    }

    /// Resolve a logical part name to an entry name.
    pub fn resolve(&self, part: &str) -> Result<&str> {
        resolve_part(part, &self.entries)
    }

    /// Open an owned, forward-only stream over an entry's uncompressed bytes.
    ///
    /// Only the entry's header is examined here; decompression and
    /// checksum failures surface from [`Read::read`] as the bytes are
    /// consumed.
    pub fn open_entry(&self, entry: &str) -> Result<EntryReader> {
        // by_name needs &mut; a private clone keeps concurrent readers apart
        let mut zip = self.zip.clone();
        let file = zip.by_name(entry).map_err(|err| match err {
            zip::result::ZipError::FileNotFound => Error::PartNotFound(entry.to_string()),
            other => other.into(),
        })?;

        let method = file.compression();
        let start = file.data_start();
        let compressed = file.compressed_size();
        let size = file.size();
        let crc = file.crc32();
        drop(file);

        let window = || {
            let mut cursor = Cursor::new(Arc::clone(&self.data));
            cursor.set_position(start);
            cursor.take(compressed)
        };

        let body = match method {
            CompressionMethod::Stored => Body::Stored(window()),
            CompressionMethod::Deflated => Body::Deflated(DeflateDecoder::new(window())),
            other => {
                log::debug!("{}: {:?} has no streaming path; buffering", entry, other);
                Body::Buffered(Deferred {
                    archive: self.clone(),
                    entry: entry.to_string(),
                    data: None,
                })
            }
        };

        Ok(EntryReader {
            name: entry.to_string(),
            body,
            hasher: crc32fast::Hasher::new(),
            expected_crc: crc,
            expected_size: size,
            consumed: 0,
            verified: false,
        })
    }

    /// Read an entry fully and decode it to UTF-8 text.
    pub fn read_part(&self, entry: &str) -> Result<String> {
        let mut reader = self.open_entry(entry)?;
        let mut bytes = Vec::with_capacity(usize::try_from(reader.size()).unwrap_or(0));
        reader.read_to_end(&mut bytes)?;
        decode_xml_bytes(bytes)
    }

    /// Decompress an entry through the zip crate's own reader.
    fn read_raw(&self, entry: &str) -> Result<Vec<u8>> {
        let mut zip = self.zip.clone();
        let mut file = zip.by_name(entry)?;
        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("entries", &self.entries.len())
            .finish()
    }
}

enum Body {
    Stored(Window),
    Deflated(DeflateDecoder<Window>),
    Buffered(Deferred),
}

/// Entry whose compression method is inflated by the zip crate, on first read.
struct Deferred {
    archive: Archive,
    entry: String,
    data: Option<Cursor<Vec<u8>>>,
}

impl Read for Deferred {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.data.is_none() {
            let bytes = self.archive.read_raw(&self.entry).map_err(io::Error::other)?;
            self.data = Some(Cursor::new(bytes));
        }
        match &mut self.data {
            Some(data) => data.read(out),
            None => Ok(0),
        }
    }
}

/// Owned stream over one archive entry's uncompressed bytes.
///
/// Reaching the end checks the byte count and CRC-32 recorded in the archive;
/// a mismatch is reported as an [`io::ErrorKind::InvalidData`] error in place
/// of the final end-of-stream.
pub struct EntryReader {
    name: String,
    body: Body,
    hasher: crc32fast::Hasher,
    expected_crc: u32,
    expected_size: u64,
    consumed: u64,
    verified: bool,
}

impl EntryReader {
    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uncompressed size recorded in the archive.
    pub fn size(&self) -> u64 {
        self.expected_size
    }

    fn verify(&mut self) -> io::Result<()> {
        if self.verified {
            return Ok(());
        }
        self.verified = true;

        if self.consumed != self.expected_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{}: expected {} bytes, got {}",
                    self.name, self.expected_size, self.consumed
                ),
            ));
        }
        if self.hasher.clone().finalize() != self.expected_crc {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: invalid checksum", self.name),
            ));
        }
        Ok(())
    }
}

impl Read for EntryReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        let n = match &mut self.body {
            Body::Stored(window) => window.read(out)?,
            Body::Deflated(inflater) => inflater.read(out)?,
            Body::Buffered(deferred) => deferred.read(out)?,
        };

        if n == 0 {
            self.verify()?;
        } else {
            self.hasher.update(&out[..n]);
            self.consumed += n as u64;
        }
        Ok(n)
    }
}

impl std::fmt::Debug for EntryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryReader")
            .field("name", &self.name)
            .field("size", &self.expected_size)
            .field("consumed", &self.consumed)
            .finish()
    }
}
