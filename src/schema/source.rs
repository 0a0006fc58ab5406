//! Schema lookup for stored and newly created records.

use std::sync::Arc;

use super::classes::{class_name, ClassDatabase};
use super::field::FieldSchema;
use crate::container::Container;
use crate::util::{Error, Result};

/// Provider of record layouts.
pub trait SchemaSource {
    /// Layout of the record at `position` in `container`.
    fn schema(&self, container: &Container, position: usize) -> Result<Arc<FieldSchema>>;

    /// Layout of a built-in class for a runtime version.
    fn class_schema(&self, version: &str, class_id: i32) -> Option<Arc<FieldSchema>>;
}

/// Answers from the type tree embedded in a container, then from a class catalog.
#[derive(Clone, Debug)]
pub struct TypeTreeSchemas {
    classes: ClassDatabase,
}

impl TypeTreeSchemas {
    pub fn new(classes: ClassDatabase) -> Self {
        Self { classes }
    }

    /// Catalog access.
    pub fn classes(&self) -> &ClassDatabase {
        &self.classes
    }
}

impl Default for TypeTreeSchemas {
    fn default() -> Self {
        Self::new(ClassDatabase::builtin())
    }
}

impl SchemaSource for TypeTreeSchemas {
    fn schema(&self, container: &Container, position: usize) -> Result<Arc<FieldSchema>> {
        let entry = container.record_type(position)?;
        if let Some(schema) = &entry.schema {
            return Ok(Arc::clone(schema));
        }
        self.class_schema(container.version(), entry.class_id)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "layout of {} (class {}) for runtime {} in {}",
                    class_name(entry.class_id),
                    entry.class_id,
                    container.version(),
                    container.name()
                ))
            })
    }

    fn class_schema(&self, version: &str, class_id: i32) -> Option<Arc<FieldSchema>> {
        self.classes.lookup(version, class_id)
    }
}
