//! Container writer.
//!
//! The metadata block is built in memory first so the data region offset is
//! known before the header is emitted; payloads are then streamed in record
//! order, each padded to [`PAYLOAD_ALIGN`].

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::*;
use super::Container;
use crate::codec::RecordWriter;
use crate::util::{Error, Result};

/// Output stream with position tracking.
pub struct ContainerStream<W: Write> {
    writer: W,
    pos: u64,
}

impl ContainerStream<BufWriter<File>> {
    /// Create (or truncate) a container file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(BufWriter::with_capacity(1024 * 1024, file)))
    }
}

impl<W: Write> ContainerStream<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, pos: 0 }
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Zero-fill up to `target`.
    pub fn pad_to(&mut self, target: u64) -> Result<()> {
        const ZEROS: [u8; PAYLOAD_ALIGN as usize] = [0; PAYLOAD_ALIGN as usize];
        while self.pos < target {
            let n = (target - self.pos).min(ZEROS.len() as u64) as usize;
            self.write_bytes(&ZEROS[..n])?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize `container` with every pending replacement applied.
pub(crate) fn write_container<W: Write>(container: &Container, out: &mut ContainerStream<W>) -> Result<()> {
    let (meta, offsets) = build_metadata(container)?;
    let data_offset = align_payload((HEADER_SIZE + meta.len()) as u64);

    out.write_bytes(CONTAINER_MAGIC)?;
    out.write_u16(CURRENT_VERSION)?;
    out.write_u16(0)?;
    out.write_u64(data_offset)?;
    out.write_bytes(&meta)?;
    out.pad_to(data_offset)?;

    for (pos, offset) in offsets.into_iter().enumerate() {
        out.pad_to(data_offset + offset)?;
        out.write_bytes(container.payload(pos)?)?;
    }
    out.flush()
}

/// Encode the table block and return it with each payload's offset
/// relative to the data region.
fn build_metadata(container: &Container) -> Result<(Vec<u8>, Vec<u64>)> {
    let mut w = RecordWriter::new();
    w.write_counted_str(container.version())?;

    w.write_u32(table_len(container.types().len())?);
    for entry in container.types() {
        w.write_i32(entry.class_id);
        let script = match entry.script_index {
            Some(i) => i16::try_from(i)
                .map_err(|_| Error::other(format!("script index {i} exceeds the type table limit")))?,
            None => NO_SCRIPT,
        };
        w.write_i16(script);

        match &entry.schema {
            Some(schema) => {
                w.write_u8(TYPE_HAS_TREE);
                let nodes = schema.flatten();
                w.write_u32(table_len(nodes.len())?);
                for (level, node) in nodes {
                    let mut flags = 0;
                    if node.is_array {
                        flags |= NODE_FLAG_ARRAY;
                    }
                    if node.is_aligned {
                        flags |= NODE_FLAG_ALIGNED;
                    }
                    w.write_u8(level);
                    w.write_u8(flags);
                    w.write_u8(node.kind as u8);
                    w.write_counted_str(&node.type_name)?;
                    w.write_counted_str(&node.name)?;
                }
            }
            None => w.write_u8(0),
        }
    }

    w.write_u32(table_len(container.script_types().len())?);
    for script in container.script_types() {
        w.write_i32(script.selector);
        w.write_i64(script.object_id);
    }

    w.write_u32(table_len(container.externals().len())?);
    for path in container.externals() {
        w.write_counted_str(path)?;
    }

    w.write_u32(table_len(container.record_count())?);
    let mut offsets = Vec::with_capacity(container.record_count());
    let mut cursor = 0u64;
    for (pos, record) in container.records().enumerate() {
        let size = container.payload(pos)?.len();
        let size32 = u32::try_from(size)
            .map_err(|_| Error::other(format!("record {} is larger than 4 GiB", record.object_id)))?;
        cursor = align_payload(cursor);
        w.write_i64(record.object_id);
        w.write_u32(record.type_index as u32);
        w.write_u64(cursor);
        w.write_u32(size32);
        offsets.push(cursor);
        cursor += size as u64;
    }

    Ok((w.into_inner(), offsets))
}

fn table_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::other(format!("table of {len} entries is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_padding() {
        let mut s = ContainerStream::new(Vec::new());
        s.write_u16(0xABCD).unwrap();
        s.pad_to(11).unwrap();
        assert_eq!(s.pos(), 11);
        s.pad_to(3).unwrap();
        let bytes = s.into_inner();
        assert_eq!(bytes.len(), 11);
        assert_eq!(&bytes[..2], &[0xCD, 0xAB]);
        assert!(bytes[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_empty_container_layout() {
        let c = Container::new("empty.assets", "2020.3.1f1");
        let mut s = ContainerStream::new(Vec::new());
        write_container(&c, &mut s).unwrap();
        let bytes = s.into_inner();
        assert_eq!(&bytes[..4], CONTAINER_MAGIC);
        assert_eq!(bytes.len() as u64 % PAYLOAD_ALIGN, 0);
    }
}
