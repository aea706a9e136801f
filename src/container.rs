//! Workbook container: assembles parts into sheets and shared strings.

use crate::archive::{resolve_path, Archive, EntryReader};
use crate::decoder::RowReader;
use crate::error::{Error, Result};
use crate::options::{OpenOptions, SheetBinding};
use crate::parts::{
    rels_part_for, PartIndex, Relationships, SharedStrings, WorkbookRegistry, CONTENT_TYPES_PART,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// State shared between a container and its sheet descriptors.
#[derive(Debug)]
struct Inner {
    archive: RwLock<Option<Archive>>,
    shared_strings: Arc<SharedStrings>,
}

impl Inner {
    fn open_entry(&self, entry: &str) -> Result<EntryReader> {
        let archive = self
            .archive
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::StreamClosed)?;
        archive.open_entry(entry)
    }
}

/// An opened XLSX workbook.
///
/// Holds the sheet descriptors, in the order the content types declare the
/// worksheet parts, and the shared-string table. Nothing here changes after
/// construction; rows are only decoded when a [`Sheet`] is opened.
pub struct Container {
    inner: Arc<Inner>,
    sheets: Vec<Sheet>,
}

impl Container {
    /// Open a workbook from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use unsheet::Container;
    ///
    /// let container = Container::open("data.xlsx")?;
    /// for sheet in container.sheets() {
    ///     println!("{}", sheet.name());
    /// }
    /// # Ok::<(), unsheet::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, &OpenOptions::default())
    }

    /// Open a workbook from a file path with options.
    pub fn open_with_options(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::ContainerOpen(format!("{}: {}", path.display(), e)))?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| Error::ContainerOpen(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes_with_options(data, options)
    }

    /// Create a container from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_options(data, &OpenOptions::default())
    }

    /// Create a container from a byte vector with options.
    pub fn from_bytes_with_options(data: Vec<u8>, options: &OpenOptions) -> Result<Self> {
        let archive = Archive::from_bytes(data)?;
        Self::assemble(archive, options)
    }

    /// Create a container from a seekable source.
    ///
    /// The whole source is read from its start, then dropped.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    fn assemble(archive: Archive, options: &OpenOptions) -> Result<Self> {
        let index = PartIndex::parse(&archive.read_part(CONTENT_TYPES_PART)?)?;
        let registry = Self::load_registry(&archive, &options.workbook_part)?;

        let shared_strings = match &index.shared_strings {
            Some(part) => {
                let entry = archive.resolve(part)?;
                SharedStrings::parse(&archive.read_part(entry)?)?
            }
            None => SharedStrings::default(),
        };

        let by_entry = match options.sheet_binding {
            SheetBinding::Relationships => {
                Self::names_by_relationship(&archive, &registry, &options.workbook_part)?
            }
            SheetBinding::FileName => HashMap::new(),
        };

        let mut bindings = Vec::with_capacity(index.worksheets.len());
        for part in &index.worksheets {
            let entry = archive.resolve(part)?;
            let name = match by_entry.get(entry) {
                Some(name) => name.clone(),
                None => match registry.name(sheet_key(entry)) {
                    Some(name) => name.to_string(),
                    None => {
                        log::warn!("no sheet name declared for {}", entry);
                        String::new()
                    }
                },
            };
            log::debug!("bound {} to sheet {:?}", entry, name);
            bindings.push((name, entry.to_string()));
        }

        let inner = Arc::new(Inner {
            archive: RwLock::new(Some(archive)),
            shared_strings: Arc::new(shared_strings),
        });

        let sheets = bindings
            .into_iter()
            .map(|(name, part)| Sheet {
                name,
                part,
                owner: Arc::clone(&inner),
            })
            .collect();

        Ok(Self { inner, sheets })
    }

    fn load_registry(archive: &Archive, workbook_part: &str) -> Result<WorkbookRegistry> {
        if !archive.exists(workbook_part) {
            log::warn!("{} not found; sheets will be unnamed", workbook_part);
            return Ok(WorkbookRegistry::default());
        }

        let registry = WorkbookRegistry::parse(&archive.read_part(workbook_part)?)?;
        if registry.is_empty() {
            log::warn!("{} declares no sheets; sheets will be unnamed", workbook_part);
        } else {
            log::debug!("{} declares {} sheets", workbook_part, registry.len());
        }
        Ok(registry)
    }

    /// Map resolved worksheet entries to display names through the
    /// workbook's relationships.
    fn names_by_relationship(
        archive: &Archive,
        registry: &WorkbookRegistry,
        workbook_part: &str,
    ) -> Result<HashMap<String, String>> {
        let mut names = HashMap::new();
        if !registry.has_relationships() {
            return Ok(names);
        }

        let rels_part = rels_part_for(workbook_part);
        if !archive.exists(&rels_part) {
            return Ok(names);
        }
        let rels = Relationships::parse(&archive.read_part(&rels_part)?)?;
        if rels.is_empty() {
            return Ok(names);
        }

        for entry in registry.entries() {
            let Some(rel) = entry.rel_id.as_deref().and_then(|id| rels.get(id)) else {
                continue;
            };
            // chartsheets and dialogsheets also hang off <sheet> elements
            if rel.external || !rel.is_worksheet() {
                continue;
            }
            names.insert(resolve_path(workbook_part, &rel.target), entry.name.clone());
        }

        log::debug!(
            "{} of {} workbook relationships bind a worksheet",
            names.len(),
            rels.len()
        );
        Ok(names)
    }

    /// Sheets in content-type declaration order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// First sheet with the given display name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Display names of all sheets.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// The shared-string table.
    pub fn shared_strings(&self) -> &[String] {
        self.inner.shared_strings.as_slice()
    }

    /// Number of sheets.
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Check if the container has no sheets.
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner
            .archive
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Release the archive.
    ///
    /// Readers that are already open keep working; opening a sheet afterwards
    /// fails with [`Error::StreamClosed`], as does closing twice.
    pub fn close(&self) -> Result<()> {
        let mut archive = self
            .inner
            .archive
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match archive.take() {
            Some(_) => {
                log::debug!("container closed");
                Ok(())
            }
            None => Err(Error::StreamClosed),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("sheets", &self.sheets)
            .field("shared_strings", &self.inner.shared_strings.len())
            .finish()
    }
}

/// A worksheet paired with its display name.
///
/// Cheap to clone. Each [`open`](Sheet::open) starts an independent pass
/// from the first row. Readers over different sheets may run on different
/// threads; coordinating several readers over the same sheet is up to the
/// caller.
#[derive(Clone)]
pub struct Sheet {
    name: String,
    part: String,
    owner: Arc<Inner>,
}

impl Sheet {
    /// Display name, empty when the workbook declares none for this part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Archive entry holding the worksheet XML.
    pub fn part_name(&self) -> &str {
        &self.part
    }

    /// Start decoding this sheet's rows.
    ///
    /// Fails only when the container is closed or the entry is missing.
    /// Nothing is decompressed until the first
    /// [`advance`](RowReader::advance).
    pub fn open(&self) -> Result<RowReader> {
        let entry = self.owner.open_entry(&self.part)?;
        Ok(RowReader::new(
            self.name.clone(),
            entry,
            Arc::clone(&self.owner.shared_strings),
        ))
    }
}

impl std::fmt::Debug for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sheet")
            .field("name", &self.name)
            .field("part", &self.part)
            .finish()
    }
}

/// The `sheetId` lookup key embedded in a worksheet file name:
/// the digits ending the file stem (`xl/worksheets/sheet12.xml` → `"12"`).
fn sheet_key(part: &str) -> &str {
    let file = part.rsplit('/').next().unwrap_or(part);
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    let digits = stem.bytes().rev().take_while(u8::is_ascii_digit).count();
    &stem[stem.len() - digits..]
}
