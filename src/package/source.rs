//! Package files from a folder or a zip archive.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
use flate2::Crc;
use memmap2::Mmap;
use tracing::{debug, trace};

use crate::util::{Error, Result};

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;
const LOCAL_SIGNATURE: u32 = 0x0403_4b50;
const EOCD_SIZE: usize = 22;
const CENTRAL_SIZE: usize = 46;
const LOCAL_SIZE: usize = 30;
const MAX_COMMENT: usize = u16::MAX as usize;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;
const FLAG_ENCRYPTED: u16 = 0x0001;

#[derive(Clone, Copy, Debug)]
struct ZipEntry {
    method: u16,
    flags: u16,
    crc: u32,
    compressed_size: usize,
    size: usize,
    local_offset: usize,
}

/// Memory-mapped zip archive with a case-insensitive entry index.
///
/// Only classic archives are read. Zip64 archives (more than 65534 entries,
/// or any entry or offset at or past 4 GiB) and encrypted entries fail with
/// [`Error::UnsupportedFeature`], as does any compression method other than
/// stored or deflate.
pub struct ZipArchive {
    mmap: Mmap,
    entries: HashMap<String, ZipEntry>,
}

impl ZipArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        if file.metadata()?.len() < EOCD_SIZE as u64 {
            return Err(Error::corrupt(format!("{} is not a zip archive", path.display())));
        }

        // Safety: read-only mapping of a file we do not modify.
        let mmap = unsafe { Mmap::map(&file) }?;
        let entries = read_central_directory(&mmap)?;
        debug!("{}: {} zip entries", path.display(), entries.len());
        Ok(Self { mmap, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&entry_key(name))
    }

    /// Decompress entry `name` into `buffer`, replacing its contents.
    pub fn read_into(&self, name: &str, buffer: &mut Vec<u8>) -> Result<()> {
        let entry = *self
            .entries
            .get(&entry_key(name))
            .ok_or_else(|| Error::not_found(format!("{name} in the package archive")))?;
        if entry.flags & FLAG_ENCRYPTED != 0 {
            return Err(Error::UnsupportedFeature(format!("encrypted zip entry {name}")));
        }

        let data = &self.mmap[..];
        let local = data
            .get(entry.local_offset..entry.local_offset + LOCAL_SIZE)
            .filter(|h| LittleEndian::read_u32(h) == LOCAL_SIGNATURE)
            .ok_or_else(|| Error::corrupt(format!("bad local header for {name}")))?;
        let start = entry.local_offset
            + LOCAL_SIZE
            + LittleEndian::read_u16(&local[26..]) as usize
            + LittleEndian::read_u16(&local[28..]) as usize;
        let raw = data
            .get(start..start + entry.compressed_size)
            .ok_or(Error::UnexpectedEof((start + entry.compressed_size) as u64))?;

        buffer.clear();
        buffer.reserve(entry.size);
        match entry.method {
            METHOD_STORED => buffer.extend_from_slice(raw),
            METHOD_DEFLATE => {
                DeflateDecoder::new(raw).read_to_end(buffer)?;
            }
            m => {
                return Err(Error::UnsupportedFeature(format!(
                    "zip compression method {m} for {name}"
                )))
            }
        }

        if buffer.len() != entry.size {
            return Err(Error::corrupt(format!(
                "{name}: expected {} bytes, got {}",
                entry.size,
                buffer.len()
            )));
        }
        let mut crc = Crc::new();
        crc.update(&buffer[..]);
        if crc.sum() != entry.crc {
            return Err(Error::corrupt(format!("{name}: checksum mismatch")));
        }
        Ok(())
    }
}

/// Lookup key: forward slashes, lowercase.
fn entry_key(name: &str) -> String {
    name.replace('\\', "/").to_lowercase()
}

fn read_central_directory(data: &[u8]) -> Result<HashMap<String, ZipEntry>> {
    let floor = data.len().saturating_sub(EOCD_SIZE + MAX_COMMENT);
    let eocd = (floor..=data.len() - EOCD_SIZE)
        .rev()
        .find(|&i| LittleEndian::read_u32(&data[i..]) == EOCD_SIGNATURE)
        .ok_or_else(|| Error::corrupt("zip end of central directory not found"))?;

    let count = LittleEndian::read_u16(&data[eocd + 10..]) as usize;
    let offset = LittleEndian::read_u32(&data[eocd + 16..]);
    if offset == u32::MAX || count == u16::MAX as usize {
        return Err(Error::UnsupportedFeature("zip64 archives".into()));
    }

    let mut entries = HashMap::with_capacity(count);
    let mut pos = offset as usize;
    for _ in 0..count {
        let header = data
            .get(pos..pos + CENTRAL_SIZE)
            .filter(|h| LittleEndian::read_u32(h) == CENTRAL_SIGNATURE)
            .ok_or_else(|| Error::corrupt(format!("bad central directory entry at {pos}")))?;

        let name_len = LittleEndian::read_u16(&header[28..]) as usize;
        let extra_len = LittleEndian::read_u16(&header[30..]) as usize;
        let comment_len = LittleEndian::read_u16(&header[32..]) as usize;
        let name_bytes = data
            .get(pos + CENTRAL_SIZE..pos + CENTRAL_SIZE + name_len)
            .ok_or(Error::UnexpectedEof((pos + CENTRAL_SIZE + name_len) as u64))?;
        let name = String::from_utf8_lossy(name_bytes);

        let entry = ZipEntry {
            flags: LittleEndian::read_u16(&header[8..]),
            method: LittleEndian::read_u16(&header[10..]),
            crc: LittleEndian::read_u32(&header[16..]),
            compressed_size: header_u32(header, 20) as usize,
            size: header_u32(header, 24) as usize,
            local_offset: header_u32(header, 42) as usize,
        };
        if [header_u32(header, 20), header_u32(header, 24), header_u32(header, 42)].contains(&u32::MAX) {
            return Err(Error::UnsupportedFeature(format!("zip64 entry {name}")));
        }
        trace!("zip entry {name}: {} -> {} bytes", entry.compressed_size, entry.size);
        if !name.ends_with('/') {
            entries.insert(entry_key(&name), entry);
        }
        pos += CENTRAL_SIZE + name_len + extra_len + comment_len;
    }
    Ok(entries)
}

#[inline]
fn header_u32(header: &[u8], at: usize) -> u32 {
    LittleEndian::read_u32(&header[at..])
}

enum Backing {
    Folder(PathBuf),
    Zip(ZipArchive),
}

/// Package contents, read through one reusable transfer buffer.
///
/// The buffer grows to the largest file read so far and is kept for the
/// whole session. Archives are limited to what [`ZipArchive`] reads; zip64
/// packages have to be unpacked and opened as a folder.
pub struct PackageSource {
    backing: Backing,
    buffer: Vec<u8>,
}

impl PackageSource {
    /// Open a package folder or zip archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let backing = if path.is_dir() {
            Backing::Folder(path.to_path_buf())
        } else {
            Backing::Zip(ZipArchive::open(path)?)
        };
        Ok(Self { backing, buffer: Vec::new() })
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.backing, Backing::Zip(_))
    }

    /// Read `name`; the slice is valid until the next read.
    pub fn read(&mut self, name: &str) -> Result<&[u8]> {
        match &self.backing {
            Backing::Folder(root) => {
                let path = root.join(name);
                let mut file = File::open(&path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::FileNotFound(path.clone())
                    } else {
                        Error::Io(e)
                    }
                })?;
                self.buffer.clear();
                file.read_to_end(&mut self.buffer)?;
            }
            Backing::Zip(zip) => {
                debug!("extracting {name}");
                zip.read_into(name, &mut self.buffer)?;
            }
        }
        Ok(self.buffer.as_slice())
    }

    /// Capacity of the transfer buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }
}
