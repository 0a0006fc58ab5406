//! Session configuration.

use serde::{Deserialize, Serialize};

/// Names and lookup hints for one patch session.
///
/// Defaults match the shipped game layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// File name of the leaf container.
    pub leaf_file: String,
    /// File name of the dependent container.
    pub dependent_file: String,
    /// Script type name of font records.
    pub font_script: String,
    /// Script type name of the global settings record.
    pub settings_script: String,
    /// Expected font script index in the leaf container.
    pub leaf_font_hint: usize,
    /// Expected font script index in the dependent container.
    pub dependent_font_hint: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            leaf_file: "resources.assets".into(),
            dependent_file: "sharedassets1.assets".into(),
            font_script: "TMP_FontAsset".into(),
            settings_script: "TMP_Settings".into(),
            leaf_font_hint: 469,
            dependent_font_hint: 347,
        }
    }
}

impl SessionConfig {
    /// Font script hint for a container.
    pub fn font_hint(&self, side: super::Side) -> usize {
        match side {
            super::Side::Leaf => self.leaf_font_hint,
            super::Side::Dependent => self.dependent_font_hint,
        }
    }

    /// File name of a container.
    pub fn file_name(&self, side: super::Side) -> &str {
        match side {
            super::Side::Leaf => &self.leaf_file,
            super::Side::Dependent => &self.dependent_file,
        }
    }
}
