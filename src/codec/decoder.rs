//! Minimal read path: record payload to [`FieldValue`] tree.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use indexmap::IndexMap;

use super::value::FieldValue;
use crate::schema::FieldSchema;
use crate::util::{align4, Error, Result, ValueKind};

/// Input cursor over one record payload.
pub struct RecordReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data) }
    }

    #[inline]
    pub fn pos(&self) -> u64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.pos() as usize)
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEof(self.pos())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| self.eof())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.cursor.read_i8().map_err(|_| self.eof())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.cursor.read_i16::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.cursor.read_i32::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor.read_u64::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.cursor.read_i64::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor.read_f32::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cursor.read_f64::<LittleEndian>().map_err(|_| self.eof())
    }

    /// Read `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEof(self.pos() + len as u64));
        }
        let start = self.pos() as usize;
        let bytes = self.cursor.get_ref()[start..start + len].to_vec();
        self.cursor.set_position((start + len) as u64);
        Ok(bytes)
    }

    /// Read a non-negative `i32` count.
    pub fn read_count(&mut self) -> Result<usize> {
        let at = self.pos();
        let n = self.read_i32()?;
        usize::try_from(n).map_err(|_| Error::corrupt(format!("negative length {n} at offset {at}")))
    }

    /// Skip padding up to the next 4-byte boundary.
    pub fn align(&mut self) -> Result<()> {
        let target = align4(self.pos() as usize);
        if target > self.cursor.get_ref().len() {
            return Err(Error::UnexpectedEof(target as u64));
        }
        self.cursor.set_position(target as u64);
        Ok(())
    }
}

/// Decode a full record; trailing bytes are an error.
pub fn decode(schema: &FieldSchema, data: &[u8]) -> Result<FieldValue> {
    let mut reader = RecordReader::new(data);
    let value = decode_node(&mut reader, schema)?;
    if reader.remaining() != 0 {
        return Err(Error::corrupt(format!(
            "{} trailing bytes after {} record",
            reader.remaining(),
            schema.type_name
        )));
    }
    Ok(value)
}

fn decode_node(r: &mut RecordReader<'_>, schema: &FieldSchema) -> Result<FieldValue> {
    let mut align = schema.is_aligned;

    if schema.is_struct() {
        let mut fields = IndexMap::with_capacity(schema.children.len());
        for child in &schema.children {
            fields.insert(child.name.clone(), decode_node(r, child)?);
        }
        if align {
            r.align()?;
        }
        return Ok(FieldValue::Struct(fields));
    }

    let mut declared = None;
    let mut value = match schema.kind {
        ValueKind::ManagedReferencesRegistry => {
            return Err(Error::UnsupportedFeature(format!(
                "managed reference registry field {} cannot be decoded",
                schema.name
            )));
        }
        ValueKind::None => FieldValue::Array(Vec::new()),
        ValueKind::Bool => FieldValue::Bool(r.read_u8()? != 0),
        ValueKind::Int8 => FieldValue::Int(r.read_i8()?.into()),
        ValueKind::UInt8 => FieldValue::UInt(r.read_u8()?.into()),
        ValueKind::Int16 => FieldValue::Int(r.read_i16()?.into()),
        ValueKind::UInt16 => FieldValue::UInt(r.read_u16()?.into()),
        ValueKind::Int32 => FieldValue::Int(r.read_i32()?.into()),
        ValueKind::UInt32 => FieldValue::UInt(r.read_u32()?.into()),
        ValueKind::Int64 => FieldValue::Int(r.read_i64()?),
        ValueKind::UInt64 => FieldValue::UInt(r.read_u64()?),
        ValueKind::Float => FieldValue::Float(r.read_f32()?),
        ValueKind::Double => FieldValue::Double(r.read_f64()?),
        ValueKind::String => {
            align = true;
            let len = r.read_count()?;
            FieldValue::String(String::from_utf8(r.read_bytes(len)?)?)
        }
        ValueKind::ByteArray => {
            let len = r.read_count()?;
            FieldValue::Bytes(r.read_bytes(len)?)
        }
        ValueKind::Array => {
            declared = Some(r.read_count()?);
            FieldValue::Array(Vec::new())
        }
    };

    if schema.is_array && schema.kind != ValueKind::ByteArray {
        let element = schema.element()?;
        let at = r.pos();
        let count = r.read_count()?;
        if declared.is_some_and(|d| d != count) {
            return Err(Error::corrupt(format!(
                "array {} declares {:?} elements but repeats {count} at offset {at}",
                schema.name, declared
            )));
        }
        let mut items = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            items.push(decode_node(r, element)?);
        }
        value = FieldValue::Array(items);
    }

    if align {
        r.align()?;
    }
    Ok(value)
}
