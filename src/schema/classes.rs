//! Class database: record layouts for built-in classes, keyed by runtime version.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::field::FieldSchema;
use crate::util::{Result, ValueKind};

/// Built-in class identifiers used by the patcher.
pub mod class_id {
    pub const MATERIAL: i32 = 21;
    pub const TEXTURE_2D: i32 = 28;
    pub const SHADER: i32 = 48;
    pub const MONO_BEHAVIOUR: i32 = 114;
    pub const MONO_SCRIPT: i32 = 115;
    pub const FONT: i32 = 128;
}

/// Human readable class name for diagnostics.
pub fn class_name(id: i32) -> &'static str {
    match id {
        class_id::MATERIAL => "Material",
        class_id::TEXTURE_2D => "Texture2D",
        class_id::SHADER => "Shader",
        class_id::MONO_BEHAVIOUR => "MonoBehaviour",
        class_id::MONO_SCRIPT => "MonoScript",
        class_id::FONT => "Font",
        _ => "Object",
    }
}

/// Layout of one class.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassLayout {
    pub class_id: i32,
    pub schema: Arc<FieldSchema>,
}

/// Layouts valid for every runtime version starting with `version_prefix`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VersionClasses {
    #[serde(default)]
    pub version_prefix: String,
    pub classes: Vec<ClassLayout>,
}

/// Versioned collection of class layouts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassDatabase {
    pub versions: Vec<VersionClasses>,
}

impl ClassDatabase {
    /// Load a catalog from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&text)?)
    }

    /// Merge another catalog; its entries take priority over ours.
    pub fn merge(&mut self, other: ClassDatabase) {
        let mut versions = other.versions;
        versions.append(&mut self.versions);
        self.versions = versions;
    }

    /// Find the layout of `class_id` for a runtime `version`.
    ///
    /// The longest matching version prefix wins; ties go to the entry added first.
    pub fn lookup(&self, version: &str, class_id: i32) -> Option<Arc<FieldSchema>> {
        self.versions
            .iter()
            .filter(|v| version.starts_with(&v.version_prefix))
            .filter_map(|v| {
                v.classes
                    .iter()
                    .find(|c| c.class_id == class_id)
                    .map(|c| (v.version_prefix.len(), c))
            })
            .fold(None, |best: Option<(usize, &ClassLayout)>, cur| match best {
                Some(b) if b.0 >= cur.0 => Some(b),
                _ => Some(cur),
            })
            .map(|(_, c)| Arc::clone(&c.schema))
    }

    /// Layouts for the classes the patcher creates or inspects.
    pub fn builtin() -> Self {
        let classes = vec![
            ClassLayout { class_id: class_id::MONO_SCRIPT, schema: Arc::new(mono_script()) },
            ClassLayout { class_id: class_id::FONT, schema: Arc::new(font()) },
            ClassLayout { class_id: class_id::TEXTURE_2D, schema: Arc::new(texture_2d()) },
            ClassLayout { class_id: class_id::MATERIAL, schema: Arc::new(material()) },
        ];
        Self {
            versions: vec![VersionClasses { version_prefix: String::new(), classes }],
        }
    }
}

fn mono_script() -> FieldSchema {
    FieldSchema::structure(
        "Base",
        "MonoScript",
        vec![
            FieldSchema::string("m_Name"),
            FieldSchema::scalar("m_ExecutionOrder", ValueKind::Int32),
            FieldSchema::string("m_ClassName"),
            FieldSchema::string("m_Namespace"),
            FieldSchema::string("m_AssemblyName"),
        ],
    )
}

/// Font layout. The leading fields are fixed: name, line spacing, default
/// material, font size, texture.
fn font() -> FieldSchema {
    FieldSchema::structure(
        "Base",
        "Font",
        vec![
            FieldSchema::string("m_Name"),
            FieldSchema::scalar("m_LineSpacing", ValueKind::Float),
            FieldSchema::pptr("m_DefaultMaterial", "Material"),
            FieldSchema::scalar("m_FontSize", ValueKind::Float),
            FieldSchema::pptr("m_Texture", "Texture"),
            FieldSchema::scalar("m_AsciiStartOffset", ValueKind::Int32),
            FieldSchema::scalar("m_Tracking", ValueKind::Float),
            FieldSchema::scalar("m_CharacterSpacing", ValueKind::Int32),
            FieldSchema::scalar("m_CharacterPadding", ValueKind::Int32),
            FieldSchema::scalar("m_ConvertCase", ValueKind::Int32),
            FieldSchema::byte_vector("m_FontData"),
            FieldSchema::scalar("m_FontSize2", ValueKind::Float),
            FieldSchema::scalar("m_Ascent", ValueKind::Float),
            FieldSchema::scalar("m_Descent", ValueKind::Float),
            FieldSchema::scalar("m_DefaultStyle", ValueKind::UInt32),
            FieldSchema::vector("m_FontNames", FieldSchema::string("data")).aligned(),
            FieldSchema::vector("m_FallbackFonts", FieldSchema::pptr("data", "Font")).aligned(),
            FieldSchema::scalar("m_FontRenderingMode", ValueKind::Int32),
            FieldSchema::scalar("m_UseLegacyBoundsCalculation", ValueKind::Bool),
            FieldSchema::scalar("m_ShouldRoundAdvanceValue", ValueKind::Bool).aligned(),
        ],
    )
}

fn texture_2d() -> FieldSchema {
    FieldSchema::structure(
        "Base",
        "Texture2D",
        vec![
            FieldSchema::string("m_Name"),
            FieldSchema::scalar("m_ForcedFallbackFormat", ValueKind::Int32),
            FieldSchema::scalar("m_DownscaleFallback", ValueKind::Bool).aligned(),
            FieldSchema::scalar("m_Width", ValueKind::Int32),
            FieldSchema::scalar("m_Height", ValueKind::Int32),
            FieldSchema::scalar("m_CompleteImageSize", ValueKind::Int32),
            FieldSchema::scalar("m_TextureFormat", ValueKind::Int32),
            FieldSchema::scalar("m_MipCount", ValueKind::Int32),
            FieldSchema::scalar("m_IsReadable", ValueKind::Bool).aligned(),
            FieldSchema::scalar("m_ImageCount", ValueKind::Int32),
            FieldSchema::byte_vector("image data"),
            FieldSchema::structure(
                "m_StreamData",
                "StreamingInfo",
                vec![
                    FieldSchema::scalar("offset", ValueKind::UInt64),
                    FieldSchema::scalar("size", ValueKind::UInt32),
                    FieldSchema::string("path"),
                ],
            ),
        ],
    )
}

fn material() -> FieldSchema {
    let vector2 = |name: &str| {
        FieldSchema::structure(
            name,
            "Vector2f",
            vec![
                FieldSchema::scalar("x", ValueKind::Float),
                FieldSchema::scalar("y", ValueKind::Float),
            ],
        )
    };
    let tex_env = FieldSchema::structure(
        "second",
        "UnityTexEnv",
        vec![
            FieldSchema::pptr("m_Texture", "Texture"),
            vector2("m_Scale"),
            vector2("m_Offset"),
        ],
    );
    let color = FieldSchema::structure(
        "second",
        "ColorRGBA",
        ["r", "g", "b", "a"]
            .into_iter()
            .map(|c| FieldSchema::scalar(c, ValueKind::Float))
            .collect(),
    );

    FieldSchema::structure(
        "Base",
        "Material",
        vec![
            FieldSchema::string("m_Name"),
            FieldSchema::pptr("m_Shader", "Shader"),
            FieldSchema::string("m_ShaderKeywords"),
            FieldSchema::scalar("m_LightmapFlags", ValueKind::UInt32),
            FieldSchema::scalar("m_EnableInstancingVariants", ValueKind::Bool),
            FieldSchema::scalar("m_DoubleSidedGI", ValueKind::Bool).aligned(),
            FieldSchema::scalar("m_CustomRenderQueue", ValueKind::Int32),
            FieldSchema::structure(
                "m_SavedProperties",
                "UnityPropertySheet",
                vec![
                    FieldSchema::vector(
                        "m_TexEnvs",
                        FieldSchema::pair("data", FieldSchema::string("first"), tex_env),
                    ),
                    FieldSchema::vector(
                        "m_Floats",
                        FieldSchema::pair(
                            "data",
                            FieldSchema::string("first"),
                            FieldSchema::scalar("second", ValueKind::Float),
                        ),
                    ),
                    FieldSchema::vector(
                        "m_Colors",
                        FieldSchema::pair("data", FieldSchema::string("first"), color),
                    ),
                ],
            ),
        ],
    )
}
