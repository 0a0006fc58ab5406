//! Container reader: header validation and table parsing.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use super::format::*;
use super::object_ref::ObjectRef;
use super::{Payload, RecordInfo, TypeEntry};
use crate::codec::RecordReader;
use crate::schema::FieldSchema;
use crate::util::{Error, Result, ValueKind};

/// Backing bytes of a loaded container.
pub(crate) enum ContainerSource {
    /// Memory-mapped file
    Mmap(Mmap),
    /// Owned buffer (built in memory or loaded from bytes)
    Memory(Vec<u8>),
}

impl ContainerSource {
    /// Map a container file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        // Safety: the mapping is read-only. A save copies it into memory
        // with `Container::detach` before renaming over the file; writes by
        // other processes while it is mapped are not guarded against.
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(Self::Mmap(mmap))
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Mmap(mmap) => &mmap[..],
            Self::Memory(buf) => &buf[..],
        }
    }
}

impl Default for ContainerSource {
    fn default() -> Self {
        Self::Memory(Vec::new())
    }
}

/// Tables parsed from a container file.
pub(crate) struct ContainerTables {
    pub version: String,
    pub types: Vec<TypeEntry>,
    pub script_types: Vec<ObjectRef>,
    pub externals: Vec<String>,
    pub records: Vec<RecordInfo>,
}

/// Validate the header and return the data region offset.
fn parse_header(data: &[u8]) -> Result<u64> {
    if data.len() < HEADER_SIZE {
        return Err(Error::UnexpectedEof(data.len() as u64));
    }
    if &data[0..4] != CONTAINER_MAGIC {
        return Err(Error::InvalidMagic);
    }

    let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
    if version != CURRENT_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let mut offset = [0u8; 8];
    offset.copy_from_slice(&data[DATA_OFFSET_OFFSET..DATA_OFFSET_OFFSET + 8]);
    Ok(u64::from_le_bytes(offset))
}

/// Parse all tables of a container image.
pub(crate) fn parse(data: &[u8]) -> Result<ContainerTables> {
    let data_offset = parse_header(data)?;
    if data_offset > data.len() as u64 || data_offset < HEADER_SIZE as u64 {
        return Err(Error::corrupt(format!("data region starts at {data_offset}")));
    }

    let mut r = RecordReader::new(&data[HEADER_SIZE..data_offset as usize]);
    let version = read_str(&mut r)?;

    let type_count = r.read_u32()? as usize;
    let mut types = Vec::with_capacity(type_count.min(r.remaining()));
    for _ in 0..type_count {
        types.push(read_type(&mut r)?);
    }

    let script_count = r.read_u32()? as usize;
    let mut script_types = Vec::with_capacity(script_count.min(r.remaining()));
    for _ in 0..script_count {
        let selector = r.read_i32()?;
        let object_id = r.read_i64()?;
        script_types.push(ObjectRef::new(selector, object_id));
    }

    let external_count = r.read_u32()? as usize;
    let mut externals = Vec::with_capacity(external_count.min(r.remaining()));
    for _ in 0..external_count {
        externals.push(read_str(&mut r)?);
    }

    let record_count = r.read_u32()? as usize;
    let mut records = Vec::with_capacity(record_count.min(r.remaining()));
    for _ in 0..record_count {
        let object_id = r.read_i64()?;
        let type_index = r.read_u32()? as usize;
        let relative = r.read_u64()?;
        let size = r.read_u32()? as usize;
        let offset = data_offset
            .checked_add(relative)
            .ok_or_else(|| Error::corrupt(format!("record {object_id} payload offset {relative} overflows")))?;

        if type_index >= types.len() {
            return Err(Error::corrupt(format!(
                "record {object_id} uses type {type_index} of {}",
                types.len()
            )));
        }
        let end = offset
            .checked_add(size as u64)
            .ok_or_else(|| Error::corrupt(format!("record {object_id} payload end overflows")))?;
        if end > data.len() as u64 {
            return Err(Error::UnexpectedEof(end));
        }
        records.push(RecordInfo {
            object_id,
            type_index,
            payload: Payload::Stored { offset: offset as usize, size },
        });
    }

    Ok(ContainerTables { version, types, script_types, externals, records })
}

fn read_str(r: &mut RecordReader<'_>) -> Result<String> {
    let len = r.read_count()?;
    Ok(String::from_utf8(r.read_bytes(len)?)?)
}

fn read_type(r: &mut RecordReader<'_>) -> Result<TypeEntry> {
    let class_id = r.read_i32()?;
    let script = r.read_i16()?;
    let flags = r.read_u8()?;

    let script_index = match script {
        NO_SCRIPT => None,
        s => Some(u16::try_from(s).map_err(|_| Error::corrupt(format!("script index {s}")))?),
    };

    let schema = if flags & TYPE_HAS_TREE != 0 {
        let count = r.read_u32()? as usize;
        let mut nodes = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            let level = r.read_u8()?;
            let node_flags = r.read_u8()?;
            let kind_byte = r.read_u8()?;
            let kind = ValueKind::from_u8(kind_byte)
                .ok_or_else(|| Error::corrupt(format!("unknown value kind {kind_byte}")))?;
            let type_name = read_str(r)?;
            let name = read_str(r)?;
            nodes.push((
                level,
                FieldSchema {
                    name,
                    type_name,
                    kind,
                    is_array: node_flags & NODE_FLAG_ARRAY != 0,
                    is_aligned: node_flags & NODE_FLAG_ALIGNED != 0,
                    children: Vec::new(),
                },
            ));
        }
        Some(Arc::new(FieldSchema::from_flat(nodes)?))
    } else {
        None
    };

    Ok(TypeEntry { class_id, script_index, schema })
}
