//! Record containers.
//!
//! A container holds a type table, a table of script types, a list of
//! external dependencies and an ordered list of records. Stored payloads are
//! read straight from the memory-mapped file; a record whose payload has been
//! replaced carries its new bytes in memory until the container is written.
//!
//! ## File layout
//!
//! ```text
//! +---------------------------+
//! | "FPAC"  version  flags    |  16-byte header
//! | data region offset (u64)  |
//! +---------------------------+
//! | runtime version           |
//! | type table (+ type trees) |
//! | script type table         |
//! | external paths            |
//! | record table              |
//! +---------------------------+
//! | payloads, 8-byte aligned  |
//! +---------------------------+
//! ```

pub mod format;
mod object_ref;
mod reader;
mod writer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

pub use object_ref::{ObjectRef, FILE_ID_FIELD, PATH_ID_FIELD};
pub use writer::ContainerStream;

use reader::ContainerSource;
use crate::schema::FieldSchema;
use crate::util::{Error, Result};

/// One entry of a container's type table.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeEntry {
    pub class_id: i32,
    /// Index into the script type table, for script-backed records.
    pub script_index: Option<u16>,
    /// Embedded layout, when the container carries type trees.
    pub schema: Option<Arc<FieldSchema>>,
}

impl TypeEntry {
    /// Entry for a built-in class without script or embedded layout.
    pub fn class(class_id: i32) -> Self {
        Self { class_id, script_index: None, schema: None }
    }

    pub fn with_script(mut self, script_index: u16) -> Self {
        self.script_index = Some(script_index);
        self
    }

    pub fn with_schema(mut self, schema: Arc<FieldSchema>) -> Self {
        self.schema = Some(schema);
        self
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Payload {
    /// Absolute range in the backing bytes
    Stored { offset: usize, size: usize },
    /// Pending replacement, authoritative at write time
    Replaced(Vec<u8>),
}

/// One record of a container.
#[derive(Clone, Debug)]
pub struct RecordInfo {
    pub object_id: i64,
    pub type_index: usize,
    pub(crate) payload: Payload,
}

impl RecordInfo {
    /// True when a pending replacement overrides the stored bytes.
    #[inline]
    pub fn is_replaced(&self) -> bool {
        matches!(self.payload, Payload::Replaced(_))
    }
}

/// A loaded container.
pub struct Container {
    name: String,
    path: Option<PathBuf>,
    version: String,
    types: Vec<TypeEntry>,
    script_types: Vec<ObjectRef>,
    externals: Vec<String>,
    records: Vec<RecordInfo>,
    source: ContainerSource,
}

impl Container {
    /// Empty in-memory container.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            version: version.into(),
            types: Vec::new(),
            script_types: Vec::new(),
            externals: Vec::new(),
            records: Vec::new(),
            source: ContainerSource::default(),
        }
    }

    /// Open a container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = ContainerSource::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut container = Self::from_source(name, source)?;
        container.path = Some(path.to_path_buf());
        debug!(
            "opened {} ({}): {} types, {} records, {} externals",
            container.name,
            container.version,
            container.types.len(),
            container.records.len(),
            container.externals.len()
        );
        Ok(container)
    }

    /// Parse a container image held in memory.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        Self::from_source(name.into(), ContainerSource::Memory(data))
    }

    fn from_source(name: String, source: ContainerSource) -> Result<Self> {
        let tables = reader::parse(source.bytes())?;
        Ok(Self {
            name,
            path: None,
            version: tables.version,
            types: tables.types,
            script_types: tables.script_types,
            externals: tables.externals,
            records: tables.records,
            source,
        })
    }

    /// File name, used in diagnostics and dependency matching.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the container was opened from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runtime version string.
    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn script_types(&self) -> &[ObjectRef] {
        &self.script_types
    }

    pub fn externals(&self) -> &[String] {
        &self.externals
    }

    #[inline]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordInfo> + '_ {
        self.records.iter()
    }

    #[inline]
    pub fn record(&self, position: usize) -> Option<&RecordInfo> {
        self.records.get(position)
    }

    fn record_or_err(&self, position: usize) -> Result<&RecordInfo> {
        self.records.get(position).ok_or_else(|| {
            Error::not_found(format!("record #{position} in {} ({} records)", self.name, self.records.len()))
        })
    }

    /// Type table entry of the record at `position`.
    pub fn record_type(&self, position: usize) -> Result<&TypeEntry> {
        let record = self.record_or_err(position)?;
        self.types.get(record.type_index).ok_or_else(|| {
            Error::corrupt(format!("record {} uses missing type {}", record.object_id, record.type_index))
        })
    }

    /// Position of the record with `object_id`.
    pub fn position_of(&self, object_id: i64) -> Option<usize> {
        self.records.iter().position(|r| r.object_id == object_id)
    }

    /// Current payload bytes of the record at `position`.
    pub fn payload(&self, position: usize) -> Result<&[u8]> {
        match &self.record_or_err(position)?.payload {
            Payload::Replaced(bytes) => Ok(bytes.as_slice()),
            Payload::Stored { offset, size } => {
                let data = self.source.bytes();
                data.get(*offset..offset + size)
                    .ok_or(Error::UnexpectedEof((offset + size) as u64))
            }
        }
    }

    /// Install a pending replacement payload.
    pub fn set_payload(&mut self, position: usize, bytes: Vec<u8>) -> Result<()> {
        self.record_or_err(position)?;
        self.records[position].payload = Payload::Replaced(bytes);
        Ok(())
    }

    /// Index of the type entry for `class_id` and `script_index`.
    pub fn find_type(&self, class_id: i32, script_index: Option<u16>) -> Option<usize> {
        self.types
            .iter()
            .position(|t| t.class_id == class_id && t.script_index == script_index)
    }

    /// Register a type entry and return its index.
    pub fn add_type(&mut self, entry: TypeEntry) -> usize {
        self.types.push(entry);
        self.types.len() - 1
    }

    /// Register a script type and return its index.
    pub fn add_script_type(&mut self, script: ObjectRef) -> Result<u16> {
        let index = u16::try_from(self.script_types.len())
            .map_err(|_| Error::other("script type table is full"))?;
        self.script_types.push(script);
        Ok(index)
    }

    /// Register an external dependency and return its selector.
    pub fn add_external(&mut self, path: impl Into<String>) -> i32 {
        self.externals.push(path.into());
        self.externals.len() as i32
    }

    /// Selector of the dependency slot naming `file_name`.
    ///
    /// Selectors are 1-based; 0 always means the container itself.
    pub fn dependency_selector(&self, file_name: &str) -> Option<i32> {
        self.externals
            .iter()
            .position(|p| {
                Path::new(p)
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(file_name))
            })
            .map(|slot| slot as i32 + 1)
    }

    /// Largest object id in the container, 0 when empty.
    pub fn max_object_id(&self) -> i64 {
        self.records.iter().map(|r| r.object_id).max().unwrap_or(0)
    }

    /// Append a record with the next object id and return its position.
    pub fn append_record(&mut self, type_index: usize, bytes: Vec<u8>) -> usize {
        let object_id = self.max_object_id() + 1;
        self.records.push(RecordInfo {
            object_id,
            type_index,
            payload: Payload::Replaced(bytes),
        });
        self.records.len() - 1
    }

    /// Serialize into any writer.
    pub fn write_to<W: std::io::Write>(&self, out: W) -> Result<()> {
        let mut stream = ContainerStream::new(out);
        writer::write_container(self, &mut stream)
    }

    /// Serialize into a file at `path`.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut stream = ContainerStream::create(path)?;
        writer::write_container(self, &mut stream)
    }

    /// Copy mapped bytes into memory and drop the mapping.
    ///
    /// Stored payloads stay readable and the backing file may then be
    /// replaced. No-op for in-memory containers.
    pub fn detach(&mut self) {
        if let ContainerSource::Mmap(mmap) = &self.source {
            let owned = mmap.to_vec();
            self.source = ContainerSource::Memory(owned);
        }
    }

    /// True while stored payloads are read from a file mapping.
    pub fn is_mapped(&self) -> bool {
        matches!(self.source, ContainerSource::Mmap(_))
    }

    /// Reload from `path`, keeping the container's name.
    ///
    /// On error the container is left unchanged.
    pub fn reopen(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut fresh = Self::open(path)?;
        fresh.name = std::mem::take(&mut self.name);
        *self = fresh;
        Ok(())
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("types", &self.types.len())
            .field("records", &self.records.len())
            .field("externals", &self.externals)
            .finish()
    }
}
