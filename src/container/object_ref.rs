//! Cross-record reference value.

use std::fmt;

use serde_json::{json, Value};

use crate::codec::FieldValue;
use crate::util::{Error, Result};

/// Field name of the selector inside a reference struct.
pub const FILE_ID_FIELD: &str = "m_FileID";

/// Field name of the object id inside a reference struct.
pub const PATH_ID_FIELD: &str = "m_PathID";

/// On-disk pointer from one record to another.
///
/// `selector == 0` means the referencing record's own container; `n > 0`
/// names dependency slot `n - 1` of that container. `(0, 0)` is null.
/// Ordering is by selector, then object id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub selector: i32,
    pub object_id: i64,
}

impl ObjectRef {
    /// The null reference.
    pub const NULL: Self = Self { selector: 0, object_id: 0 };

    pub const fn new(selector: i32, object_id: i64) -> Self {
        Self { selector, object_id }
    }

    /// Reference into the same container.
    pub const fn local(object_id: i64) -> Self {
        Self { selector: 0, object_id }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.selector == 0 && self.object_id == 0
    }

    /// Read from a decoded reference struct.
    pub fn from_field(field: &FieldValue) -> Result<Self> {
        let selector = field
            .get(FILE_ID_FIELD)
            .and_then(FieldValue::as_i64)
            .and_then(|v| i32::try_from(v).ok());
        let object_id = field.get(PATH_ID_FIELD).and_then(FieldValue::as_i64);
        match (selector, object_id) {
            (Some(selector), Some(object_id)) => Ok(Self { selector, object_id }),
            _ => Err(Error::TypeMismatch {
                expected: "object reference".into(),
                actual: format!("{field:?}"),
            }),
        }
    }

    /// Overwrite a decoded reference struct in place.
    pub fn write_field(&self, field: &mut FieldValue) -> Result<()> {
        if !matches!(field, FieldValue::Struct(_)) {
            return Err(Error::TypeMismatch {
                expected: "object reference".into(),
                actual: format!("{field:?}"),
            });
        }
        field.set(FILE_ID_FIELD, FieldValue::Int(self.selector.into()));
        field.set(PATH_ID_FIELD, FieldValue::Int(self.object_id));
        Ok(())
    }

    /// Read from a structured description object.
    pub fn from_json(node: &Value) -> Result<Self> {
        let selector = node
            .get(FILE_ID_FIELD)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok());
        let object_id = node.get(PATH_ID_FIELD).and_then(Value::as_i64);
        match (selector, object_id) {
            (Some(selector), Some(object_id)) => Ok(Self { selector, object_id }),
            _ => Err(Error::value_type("object reference", format!("{FILE_ID_FIELD}/{PATH_ID_FIELD} object"))),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ FILE_ID_FIELD: self.selector, PATH_ID_FIELD: self.object_id })
    }

    /// Overwrite a structured description node, replacing non-objects.
    pub fn write_json(&self, node: &mut Value) {
        match node.as_object_mut() {
            Some(map) => {
                map.insert(FILE_ID_FIELD.into(), self.selector.into());
                map.insert(PATH_ID_FIELD.into(), self.object_id.into());
            }
            None => *node = self.to_json(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.selector, self.object_id)
    }
}
