//! # fontpatch
//!
//! Patches TextMeshPro font records stored in a pair of binary asset
//! containers: a leaf container that receives every new record and a
//! dependent container that may only reach into the leaf.
//!
//! ## Modules
//!
//! - [`util`] - value kinds and errors
//! - [`schema`] - field schemas and built-in class layouts
//! - [`codec`] - schema-driven record encoder and decoder
//! - [`container`] - on-disk container format, read and write
//! - [`registry`] - the two-container registry and logical indices
//! - [`patch`] - font, atlas, material and character operations
//! - [`package`] - package manifests applied as a batch
//!
//! ## Example
//!
//! ```ignore
//! use fontpatch::prelude::*;
//!
//! let mut patcher = FontPatcher::open_default("Game_Data")?;
//! let mut package = PackageSource::open("fonts.zip")?;
//! apply_package(&mut patcher, &mut package)?;
//! patcher.save()?;
//! ```

pub mod util;
pub mod schema;
pub mod codec;
pub mod container;
pub mod registry;
pub mod patch;
pub mod package;

// Re-export commonly used types
pub use util::{Error, Result, ValueKind};
pub use codec::{decode, encode, DynamicNode, FieldValue};
pub use container::{Container, ObjectRef, TypeEntry};
pub use registry::{LogicalIndex, Registry, SessionConfig, Side};
pub use patch::FontPatcher;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, ValueKind};
    pub use crate::schema::{FieldSchema, SchemaSource, TypeTreeSchemas};
    pub use crate::codec::{decode, encode, FieldValue};
    pub use crate::container::{Container, ObjectRef};
    pub use crate::registry::{LogicalIndex, Registry, SessionConfig, Side};
    pub use crate::patch::FontPatcher;
    pub use crate::package::{apply_package, Manifest, PackageSource};
}
