//! Field schema tree describing one record type's binary layout.

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result, ValueKind};

/// Name of the size child of an array node.
pub const ARRAY_SIZE_FIELD: &str = "size";

/// Name of the element child of an array node.
pub const ARRAY_DATA_FIELD: &str = "data";

/// Name of the array node inside a `vector` struct.
pub const ARRAY_FIELD: &str = "Array";

/// One node of a record layout.
///
/// Schemas are immutable once built and shared (behind `Arc`) by every record
/// of the same type and runtime version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub is_aligned: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldSchema>,
}

impl FieldSchema {
    /// Struct node with the given children.
    pub fn structure(
        name: impl Into<String>,
        type_name: impl Into<String>,
        children: Vec<FieldSchema>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind: ValueKind::None,
            is_array: false,
            is_aligned: false,
            children,
        }
    }

    /// Fixed-width scalar node.
    pub fn scalar(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            type_name: kind.name().to_string(),
            kind,
            is_array: false,
            is_aligned: false,
            children: Vec::new(),
        }
    }

    /// Length-prefixed string node.
    pub fn string(name: impl Into<String>) -> Self {
        Self::scalar(name, ValueKind::String)
    }

    /// Object reference node (`m_FileID`, `m_PathID`).
    pub fn pptr(name: impl Into<String>, target: &str) -> Self {
        Self::structure(
            name,
            format!("PPtr<{target}>"),
            vec![
                Self::scalar("m_FileID", ValueKind::Int32),
                Self::scalar("m_PathID", ValueKind::Int64),
            ],
        )
    }

    /// `vector` struct wrapping a generic array of `element`.
    pub fn vector(name: impl Into<String>, element: FieldSchema) -> Self {
        let mut data = element;
        data.name = ARRAY_DATA_FIELD.to_string();
        let array = Self {
            name: ARRAY_FIELD.to_string(),
            type_name: ARRAY_FIELD.to_string(),
            kind: ValueKind::Array,
            is_array: true,
            is_aligned: false,
            children: vec![Self::scalar(ARRAY_SIZE_FIELD, ValueKind::Int32), data],
        };
        Self::structure(name, "vector", vec![array])
    }

    /// `vector` struct wrapping a raw byte blob.
    pub fn byte_vector(name: impl Into<String>) -> Self {
        let array = Self {
            name: ARRAY_FIELD.to_string(),
            type_name: ARRAY_FIELD.to_string(),
            kind: ValueKind::ByteArray,
            is_array: true,
            is_aligned: true,
            children: vec![
                Self::scalar(ARRAY_SIZE_FIELD, ValueKind::Int32),
                Self::scalar(ARRAY_DATA_FIELD, ValueKind::UInt8),
            ],
        };
        Self::structure(name, "vector", vec![array])
    }

    /// `pair` struct with `first` and `second` children.
    pub fn pair(name: impl Into<String>, first: FieldSchema, second: FieldSchema) -> Self {
        let mut first = first;
        first.name = "first".to_string();
        let mut second = second;
        second.name = "second".to_string();
        Self::structure(name, "pair", vec![first, second])
    }

    /// Mark this node as aligned to 4 bytes after its content.
    pub fn aligned(mut self) -> Self {
        self.is_aligned = true;
        self
    }

    /// True when the node has an intrinsic value.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.kind != ValueKind::None
    }

    /// True for struct nodes: no intrinsic value and not an array.
    #[inline]
    pub fn is_struct(&self) -> bool {
        !self.has_value() && !self.is_array
    }

    /// Child by name.
    pub fn child(&self, name: &str) -> Option<&FieldSchema> {
        self.children.iter().find(|c| c.name == name)
    }

    /// The designated element child of an array node.
    pub fn element(&self) -> Result<&FieldSchema> {
        self.children.get(1).ok_or_else(|| {
            Error::corrupt(format!("array field {} has no element child", self.name))
        })
    }

    /// Pre-order flattening with depth, the on-disk type tree shape.
    pub fn flatten(&self) -> Vec<(u8, &FieldSchema)> {
        let mut out = Vec::new();
        fn walk<'a>(node: &'a FieldSchema, depth: u8, out: &mut Vec<(u8, &'a FieldSchema)>) {
            out.push((depth, node));
            for child in &node.children {
                walk(child, depth + 1, out);
            }
        }
        walk(self, 0, &mut out);
        out
    }

    /// Rebuild a tree from pre-order `(depth, node)` pairs.
    ///
    /// The nodes' own `children` are ignored; nesting comes from depth only.
    pub fn from_flat(nodes: Vec<(u8, FieldSchema)>) -> Result<Self> {
        let mut stack: Vec<(u8, FieldSchema)> = Vec::new();
        let mut root = None;

        for (depth, mut node) in nodes {
            node.children.clear();
            while stack.last().is_some_and(|(top, _)| *top >= depth) {
                if let Some((_, done)) = stack.pop() {
                    attach(&mut stack, &mut root, done);
                }
            }
            match stack.last() {
                None if depth != 0 || root.is_some() => {
                    return Err(Error::corrupt("type tree must have exactly one root at depth 0"));
                }
                Some((top, _)) if depth != top + 1 => {
                    return Err(Error::corrupt(format!(
                        "type tree skips a level at {}",
                        node.name
                    )));
                }
                _ => {}
            }
            stack.push((depth, node));
        }
        while let Some((_, done)) = stack.pop() {
            attach(&mut stack, &mut root, done);
        }

        fn attach(stack: &mut [(u8, FieldSchema)], root: &mut Option<FieldSchema>, node: FieldSchema) {
            match stack.last_mut() {
                Some((_, parent)) => parent.children.push(node),
                None => *root = Some(node),
            }
        }

        root.ok_or_else(|| Error::corrupt("empty type tree"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FieldSchema {
        FieldSchema::structure(
            "Base",
            "Sample",
            vec![
                FieldSchema::string("m_Name"),
                FieldSchema::pptr("m_Texture", "Texture2D"),
                FieldSchema::vector("m_Values", FieldSchema::scalar("x", ValueKind::Float)),
                FieldSchema::scalar("m_Enabled", ValueKind::UInt8).aligned(),
            ],
        )
    }

    #[test]
    fn test_struct_detection() {
        let schema = sample();
        assert!(schema.is_struct());
        assert!(!schema.child("m_Name").unwrap().is_struct());
        let array = &schema.child("m_Values").unwrap().children[0];
        assert!(array.is_array);
        assert!(!array.is_struct());
        assert_eq!(array.element().unwrap().kind, ValueKind::Float);
        assert_eq!(array.element().unwrap().name, ARRAY_DATA_FIELD);
    }

    #[test]
    fn test_flatten_rebuild() {
        let schema = sample();
        let flat: Vec<(u8, FieldSchema)> = schema
            .flatten()
            .into_iter()
            .map(|(d, n)| (d, n.clone()))
            .collect();
        assert_eq!(flat[0].0, 0);
        assert_eq!(flat[1].0, 1);
        let rebuilt = FieldSchema::from_flat(flat).unwrap();
        assert_eq!(rebuilt, schema);
    }

    #[test]
    fn test_from_flat_rejects_gaps() {
        let nodes = vec![
            (0, FieldSchema::structure("Base", "T", vec![])),
            (2, FieldSchema::scalar("x", ValueKind::Int32)),
        ];
        assert!(FieldSchema::from_flat(nodes).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let schema = sample();
        let json = serde_json::to_string(&schema).unwrap();
        let back: FieldSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
