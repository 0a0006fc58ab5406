//! Dynamic input trees accepted by the encoder.

use std::borrow::Cow;

use serde_json::Value;

use super::value::FieldValue;

/// An attributed value tree the encoder can walk alongside a schema.
///
/// Every conversion returns `None` when the node cannot represent the
/// requested value; the encoder turns that into a type mismatch.
pub trait DynamicNode: Sized {
    /// True for object/struct nodes.
    fn is_object(&self) -> bool;

    /// Named child of an object node.
    fn field(&self, name: &str) -> Option<&Self>;

    /// Elements of an array node.
    fn elements(&self) -> Option<&[Self]>;

    fn to_bool(&self) -> Option<bool>;

    fn to_i64(&self) -> Option<i64>;

    fn to_u64(&self) -> Option<u64>;

    fn to_f64(&self) -> Option<f64>;

    fn to_text(&self) -> Option<Cow<'_, str>>;

    /// Raw bytes of a byte-blob field.
    fn to_blob(&self) -> Option<Cow<'_, [u8]>>;
}

impl DynamicNode for Value {
    fn is_object(&self) -> bool {
        self.is_object()
    }

    fn field(&self, name: &str) -> Option<&Self> {
        self.as_object().and_then(|m| m.get(name))
    }

    fn elements(&self) -> Option<&[Self]> {
        self.as_array().map(Vec::as_slice)
    }

    fn to_bool(&self) -> Option<bool> {
        self.as_bool()
    }

    fn to_i64(&self) -> Option<i64> {
        self.as_i64()
    }

    fn to_u64(&self) -> Option<u64> {
        self.as_u64()
    }

    fn to_f64(&self) -> Option<f64> {
        self.as_f64()
    }

    /// `null` reads as the empty string.
    fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Null => Some(Cow::Borrowed("")),
            _ => None,
        }
    }

    fn to_blob(&self) -> Option<Cow<'_, [u8]>> {
        self.as_array()?
            .iter()
            .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Cow::Owned)
    }
}

impl DynamicNode for FieldValue {
    fn is_object(&self) -> bool {
        matches!(self, FieldValue::Struct(_))
    }

    fn field(&self, name: &str) -> Option<&Self> {
        self.get(name)
    }

    fn elements(&self) -> Option<&[Self]> {
        self.as_array()
    }

    fn to_bool(&self) -> Option<bool> {
        self.as_bool()
    }

    fn to_i64(&self) -> Option<i64> {
        self.as_i64()
    }

    fn to_u64(&self) -> Option<u64> {
        self.as_u64()
    }

    fn to_f64(&self) -> Option<f64> {
        self.as_f64()
    }

    fn to_text(&self) -> Option<Cow<'_, str>> {
        self.as_str().map(Cow::Borrowed)
    }

    fn to_blob(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            FieldValue::Bytes(bytes) => Some(Cow::Borrowed(bytes)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_node_views() {
        let v = json!({"a": [1, 2, 255], "s": null, "n": 3.5});
        assert!(DynamicNode::is_object(&v));
        assert_eq!(v.field("a").and_then(DynamicNode::to_blob).unwrap().as_ref(), &[1, 2, 255]);
        assert_eq!(v.field("s").and_then(DynamicNode::to_text).unwrap(), "");
        assert_eq!(v.field("n").and_then(DynamicNode::to_f64), Some(3.5));
        assert_eq!(v.field("n").and_then(DynamicNode::to_i64), None);
        assert!(json!([256]).to_blob().is_none());
    }

    #[test]
    fn test_field_value_blob_is_borrowed() {
        let v = FieldValue::Bytes(vec![9, 8]);
        assert!(matches!(v.to_blob(), Some(Cow::Borrowed(_))));
        assert!(FieldValue::Array(vec![]).to_blob().is_none());
    }
}
