//! Schema-driven encoder from dynamic trees to record payloads.

use super::node::DynamicNode;
use super::writer::{length_prefix, RecordWriter};
use crate::schema::FieldSchema;
use crate::util::{Error, Result, ValueKind};

/// Encode `value` against `schema` into a fresh record payload.
///
/// Pure function of its inputs. On error nothing is returned, so a partial
/// payload can never be installed.
pub fn encode<N: DynamicNode>(schema: &FieldSchema, value: &N) -> Result<Vec<u8>> {
    let mut writer = RecordWriter::new();
    encode_node(&mut writer, schema, value)?;
    Ok(writer.into_inner())
}

fn encode_node<N: DynamicNode>(w: &mut RecordWriter, schema: &FieldSchema, node: &N) -> Result<()> {
    let mut align = schema.is_aligned;

    if schema.is_struct() {
        if !node.is_object() {
            return Err(Error::value_type(&schema.name, format!("object of type {}", schema.type_name)));
        }
        for child in &schema.children {
            let value = node.field(&child.name).ok_or_else(|| Error::SchemaMismatch {
                field: child.name.clone(),
                parent: schema.name.clone(),
            })?;
            encode_node(w, child, value)?;
        }
        if align {
            w.align();
        }
        return Ok(());
    }

    match schema.kind {
        ValueKind::ManagedReferencesRegistry => {
            return Err(Error::UnsupportedFeature(format!(
                "managed reference registry field {} cannot be encoded",
                schema.name
            )));
        }
        ValueKind::None => {}
        ValueKind::Bool => {
            let v = node.to_bool().ok_or_else(|| mismatch(schema))?;
            w.write_u8(u8::from(v));
        }
        ValueKind::Int8 => w.write_i8(signed(schema, node)?),
        ValueKind::UInt8 => w.write_u8(unsigned(schema, node)?),
        ValueKind::Int16 => w.write_i16(signed(schema, node)?),
        ValueKind::UInt16 => w.write_u16(unsigned(schema, node)?),
        ValueKind::Int32 => w.write_i32(signed(schema, node)?),
        ValueKind::UInt32 => w.write_u32(unsigned(schema, node)?),
        ValueKind::Int64 => w.write_i64(signed(schema, node)?),
        ValueKind::UInt64 => w.write_u64(unsigned(schema, node)?),
        ValueKind::Float => {
            let v = node.to_f64().ok_or_else(|| mismatch(schema))?;
            w.write_f32(v as f32);
        }
        ValueKind::Double => {
            let v = node.to_f64().ok_or_else(|| mismatch(schema))?;
            w.write_f64(v);
        }
        ValueKind::String => {
            align = true;
            let text = node.to_text().ok_or_else(|| mismatch(schema))?;
            w.write_counted_str(&text)?;
        }
        ValueKind::ByteArray => {
            let blob = node.to_blob().ok_or_else(|| mismatch(schema))?;
            w.write_i32(count(schema, blob.len())?);
            w.write_bytes(&blob);
        }
        ValueKind::Array => {
            let items = node.elements().ok_or_else(|| mismatch(schema))?;
            w.write_i32(count(schema, items.len())?);
        }
    }

    // The consuming reader expects ordinary arrays to repeat their element
    // count ahead of the elements. Byte blobs are exempt.
    if schema.is_array && schema.kind != ValueKind::ByteArray {
        let element = schema.element()?;
        let items = node.elements().ok_or_else(|| mismatch(schema))?;
        w.write_i32(count(schema, items.len())?);
        for item in items {
            encode_node(w, element, item)?;
        }
    }

    if align {
        w.align();
    }
    Ok(())
}

fn mismatch(schema: &FieldSchema) -> Error {
    let expected = match schema.kind {
        ValueKind::Array | ValueKind::None => "array".to_string(),
        ValueKind::ByteArray => "array of bytes".to_string(),
        kind => kind.name().to_string(),
    };
    Error::value_type(&schema.name, expected)
}

fn count(schema: &FieldSchema, len: usize) -> Result<i32> {
    length_prefix(len).map_err(|_| Error::OutOfRange(format!("{} holds {len} elements", schema.name)))
}

fn signed<T: TryFrom<i64>, N: DynamicNode>(schema: &FieldSchema, node: &N) -> Result<T> {
    node.to_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| mismatch(schema))
}

fn unsigned<T: TryFrom<u64>, N: DynamicNode>(schema: &FieldSchema, node: &N) -> Result<T> {
    node.to_u64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| mismatch(schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pptr_schema() -> FieldSchema {
        FieldSchema::structure("Base", "T", vec![FieldSchema::pptr("m_Ref", "Object")])
    }

    #[test]
    fn test_scalar_layout() {
        let schema = FieldSchema::structure(
            "Base",
            "T",
            vec![
                FieldSchema::scalar("a", ValueKind::UInt8),
                FieldSchema::scalar("b", ValueKind::Int16),
                FieldSchema::scalar("c", ValueKind::Float),
            ],
        );
        let bytes = encode(&schema, &json!({"a": 7, "b": -1, "c": 1.0})).unwrap();
        assert_eq!(bytes, vec![7, 0xFF, 0xFF, 0, 0, 0x80, 0x3F]);
    }

    #[test]
    fn test_string_forces_alignment() {
        let schema = FieldSchema::structure(
            "Base",
            "T",
            vec![FieldSchema::string("s"), FieldSchema::scalar("n", ValueKind::UInt8)],
        );
        let bytes = encode(&schema, &json!({"s": "abcde", "n": 1})).unwrap();
        // 4 length + 5 chars -> padded to 12, then n.
        assert_eq!(bytes.len(), 13);
        assert_eq!(&bytes[..4], &[5, 0, 0, 0]);
        assert_eq!(&bytes[9..12], &[0, 0, 0]);
        assert_eq!(bytes[12], 1);
    }

    #[test]
    fn test_array_count_is_repeated() {
        let schema = FieldSchema::structure(
            "Base",
            "T",
            vec![FieldSchema::vector("v", FieldSchema::scalar("x", ValueKind::Int32))],
        );
        let bytes = encode(&schema, &json!({"v": {"Array": [10, 20]}})).unwrap();
        assert_eq!(
            bytes,
            vec![2, 0, 0, 0, 2, 0, 0, 0, 10, 0, 0, 0, 20, 0, 0, 0]
        );
    }

    #[test]
    fn test_byte_array_single_prefix() {
        let schema = FieldSchema::structure("Base", "T", vec![FieldSchema::byte_vector("data")]);
        let bytes = encode(&schema, &json!({"data": {"Array": [1, 2, 3]}})).unwrap();
        assert_eq!(bytes, vec![3, 0, 0, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_oversized_count_is_out_of_range() {
        let blob = FieldSchema::byte_vector("data");
        assert_eq!(count(&blob, 3).unwrap(), 3);
        let err = count(&blob, i32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(ref msg) if msg.contains("data")), "{err}");
    }

    #[test]
    fn test_aligned_struct_pads() {
        let inner = FieldSchema::structure(
            "inner",
            "Inner",
            vec![FieldSchema::scalar("flag", ValueKind::Bool)],
        )
        .aligned();
        let schema = FieldSchema::structure(
            "Base",
            "T",
            vec![inner, FieldSchema::scalar("n", ValueKind::UInt8)],
        );
        let bytes = encode(&schema, &json!({"inner": {"flag": true}, "n": 2})).unwrap();
        assert_eq!(bytes, vec![1, 0, 0, 0, 2]);
    }

    #[test]
    fn test_missing_field() {
        let err = encode(&pptr_schema(), &json!({"m_Ref": {"m_FileID": 0}})).unwrap_err();
        match err {
            Error::SchemaMismatch { field, parent } => {
                assert_eq!(field, "m_PathID");
                assert_eq!(parent, "m_Ref");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_value_type_mismatch() {
        let err = encode(&pptr_schema(), &json!({"m_Ref": {"m_FileID": "zero", "m_PathID": 1}}))
            .unwrap_err();
        assert!(matches!(err, Error::ValueTypeMismatch { .. }));

        let schema = FieldSchema::structure("Base", "T", vec![FieldSchema::scalar("b", ValueKind::UInt8)]);
        let err = encode(&schema, &json!({"b": 300})).unwrap_err();
        assert!(matches!(err, Error::ValueTypeMismatch { .. }));
    }

    #[test]
    fn test_managed_references_unsupported() {
        let schema = FieldSchema::structure(
            "Base",
            "T",
            vec![FieldSchema::scalar("references", ValueKind::ManagedReferencesRegistry)],
        );
        let err = encode(&schema, &json!({"references": {}})).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature(_)));
    }

    #[test]
    fn test_extra_json_fields_ignored() {
        let bytes = encode(
            &pptr_schema(),
            &json!({"m_Ref": {"m_FileID": 1, "m_PathID": 2}, "m_IsMultiAtlasTexturesEnabled": true}),
        )
        .unwrap();
        assert_eq!(bytes.len(), 12);
    }
}
