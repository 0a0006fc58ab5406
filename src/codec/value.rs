//! Decoded record field tree.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// A decoded record, or any sub-tree of one.
///
/// Integer kinds collapse into [`FieldValue::Int`] / [`FieldValue::UInt`]; the
/// schema restores the exact width when the tree is encoded again.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<FieldValue>),
    Struct(IndexMap<String, FieldValue>),
}

impl FieldValue {
    /// Empty struct.
    pub fn empty_struct() -> Self {
        Self::Struct(IndexMap::new())
    }

    /// Child of a struct by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        match self {
            Self::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Mutable child of a struct by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        match self {
            Self::Struct(fields) => fields.get_mut(name),
            _ => None,
        }
    }

    /// Child of a struct by declaration order.
    pub fn get_index(&self, index: usize) -> Option<&FieldValue> {
        match self {
            Self::Struct(fields) => fields.get_index(index).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Mutable child of a struct by declaration order.
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut FieldValue> {
        match self {
            Self::Struct(fields) => fields.get_index_mut(index).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follow a path of struct field names.
    pub fn at(&self, path: &[&str]) -> Option<&FieldValue> {
        path.iter().try_fold(self, |node, name| node.get(name))
    }

    /// Mutable variant of [`FieldValue::at`].
    pub fn at_mut(&mut self, path: &[&str]) -> Option<&mut FieldValue> {
        path.iter().try_fold(self, |node, name| node.get_mut(name))
    }

    /// Insert or replace a struct field. No-op on non-struct values.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        if let Self::Struct(fields) = self {
            fields.insert(name.to_string(), value);
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, if it fits an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Integer value, if it fits a `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<FieldValue>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Render as a structured description, the inverse of the encoder's input.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(v) => Value::from(*v),
            Self::UInt(v) => Value::from(*v),
            Self::Float(v) => Number::from_f64(f64::from(*v)).map_or(Value::Null, Value::Number),
            Self::Double(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Bytes(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            Self::Array(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            Self::Struct(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}
