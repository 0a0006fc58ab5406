//! Record layouts.
//!
//! A [`FieldSchema`] tree describes how one record type is laid out for one
//! runtime version. Layouts come from the type tree a container embeds or,
//! when it carries none, from a [`ClassDatabase`].

mod classes;
mod field;
mod source;

pub use classes::{class_id, class_name, ClassDatabase, ClassLayout, VersionClasses};
pub use field::{FieldSchema, ARRAY_DATA_FIELD, ARRAY_FIELD, ARRAY_SIZE_FIELD};
pub use source::{SchemaSource, TypeTreeSchemas};
