//! Package manifest.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::jsonc;
use crate::util::{Error, Result};

/// Name of the manifest inside a package.
pub const MANIFEST_FILE: &str = "manifest.json";

/// A file inside the package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
}

/// Material payload and the atlas (index into `atlases`) it samples.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub path: String,
    pub atlas: usize,
}

/// Font description, its material and optional source font.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontEntry {
    pub path: String,
    pub material: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_font: Option<usize>,
}

/// Character removal settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoveCharacters {
    /// Codepoints to remove.
    pub from_characters: Vec<u32>,
    /// Fonts whose whole character set is removed.
    pub from_font: Vec<String>,
    /// Leave fonts replaced by this package untouched.
    pub exclude_replaced: bool,
    /// Fonts never touched.
    pub exclude_fonts: Vec<String>,
}

/// Top-level `manifest.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    pub source_font_files: Vec<FileEntry>,
    pub atlases: Vec<FileEntry>,
    pub materials: Vec<MaterialEntry>,
    pub fonts: Vec<FontEntry>,
    /// Existing font name to index into `fonts`.
    pub font_replacements: IndexMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_characters: Option<RemoveCharacters>,
}

impl Manifest {
    /// Parse and check cross-entry indices.
    ///
    /// Comments and trailing commas are accepted.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let manifest: Manifest = jsonc::from_slice(data)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for (i, m) in self.materials.iter().enumerate() {
            check(m.atlas, self.atlases.len(), || format!("atlas {} of material {i}", m.atlas))?;
        }
        for (i, f) in self.fonts.iter().enumerate() {
            check(f.material, self.materials.len(), || format!("material {} of font {i}", f.material))?;
            if let Some(s) = f.source_font {
                check(s, self.source_font_files.len(), || format!("source font {s} of font {i}"))?;
            }
        }
        for (name, &f) in &self.font_replacements {
            check(f, self.fonts.len(), || format!("font {f} replacing {name}"))?;
        }
        Ok(())
    }
}

fn check(index: usize, len: usize, what: impl FnOnce() -> String) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::not_found(format!("{} in manifest ({len} entries)", what())))
    }
}
