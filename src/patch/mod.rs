//! Patch operations over a [`Registry`].
//!
//! Every operation validates its inputs and encodes its output completely
//! before it appends or installs anything, so a failed call leaves the
//! registry as it was.

mod characters;
mod fallback;
mod font;
mod material;

use std::path::Path;

use crate::registry::{Registry, SessionConfig};
use crate::schema::SchemaSource;
use crate::util::Result;

/// Name of the texture environment an injected material samples its atlas from.
pub const MAIN_TEXTURE: &str = "_MainTex";

/// Atlas population mode meaning glyphs are rendered from a source font at runtime.
pub const DYNAMIC_POPULATION: i64 = 1;

/// Font patch session.
#[derive(Debug)]
pub struct FontPatcher {
    registry: Registry,
}

impl FontPatcher {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Open the containers of a game data directory.
    pub fn open(data_dir: impl AsRef<Path>, config: SessionConfig, schemas: Box<dyn SchemaSource>) -> Result<Self> {
        Registry::open(data_dir, config, schemas).map(Self::new)
    }

    /// Open with the default session settings and built-in class layouts.
    pub fn open_default(data_dir: impl AsRef<Path>) -> Result<Self> {
        Registry::open_default(data_dir).map(Self::new)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Write all pending changes.
    pub fn save(&mut self) -> Result<()> {
        self.registry.save()
    }
}
