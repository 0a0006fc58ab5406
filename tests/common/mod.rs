//! Shared fixture: a leaf and a dependent container with TMP fonts,
//! written to a temporary game data directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fontpatch::container::{Container, ObjectRef, TypeEntry};
use fontpatch::patch::FontPatcher;
use fontpatch::schema::{class_id, ClassDatabase, FieldSchema};
use fontpatch::{encode, LogicalIndex, ValueKind};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const VERSION: &str = "2020.3.48f1";
pub const LEAF_FILE: &str = "resources.assets";
pub const DEPENDENT_FILE: &str = "sharedassets1.assets";

// Leaf record positions. Object ids are position + 1.
pub const FONT_SCRIPT: usize = 0;
pub const SETTINGS_SCRIPT: usize = 1;
pub const LEAF_ATLAS: usize = 2;
pub const LEAF_MATERIAL: usize = 3;
pub const LEAF_LIBERATION: usize = 4;
pub const LEAF_BITTER: usize = 5;
pub const SETTINGS: usize = 6;

// Dependent record positions.
pub const DEP_ATLAS: usize = 0;
pub const DEP_MATERIAL: usize = 1;
pub const DEP_LIBERATION: usize = 2;
pub const DEP_ONLY: usize = 3;

/// Selector of resources.assets inside sharedassets1.assets.
pub const LEAF_SELECTOR: i32 = 2;

pub const SHADER_ID: i64 = 900;

pub fn id(position: usize) -> i64 {
    position as i64 + 1
}

pub fn leaf(position: usize) -> LogicalIndex {
    LogicalIndex::Leaf(position)
}

pub fn dependent(position: usize) -> LogicalIndex {
    LogicalIndex::Dependent(position)
}

pub fn pptr(selector: i32, object_id: i64) -> Value {
    json!({"m_FileID": selector, "m_PathID": object_id})
}

pub fn font_schema() -> FieldSchema {
    let character = FieldSchema::structure(
        "data",
        "TMP_Character",
        vec![
            FieldSchema::scalar("m_Unicode", ValueKind::UInt32),
            FieldSchema::scalar("m_GlyphIndex", ValueKind::UInt32),
        ],
    );
    FieldSchema::structure(
        "Base",
        "MonoBehaviour",
        vec![
            FieldSchema::pptr("m_GameObject", "GameObject"),
            FieldSchema::scalar("m_Enabled", ValueKind::UInt8).aligned(),
            FieldSchema::pptr("m_Script", "MonoScript"),
            FieldSchema::string("m_Name"),
            FieldSchema::scalar("m_AtlasPopulationMode", ValueKind::Int32),
            FieldSchema::pptr("m_SourceFontFile", "Font"),
            FieldSchema::pptr("material", "Material"),
            FieldSchema::vector("m_AtlasTextures", FieldSchema::pptr("data", "Texture2D")),
            FieldSchema::vector("m_CharacterTable", character),
            FieldSchema::vector("m_FallbackFontAssetTable", FieldSchema::pptr("data", "TMP_FontAsset")),
        ],
    )
}

pub fn settings_schema() -> FieldSchema {
    FieldSchema::structure(
        "Base",
        "MonoBehaviour",
        vec![
            FieldSchema::pptr("m_GameObject", "GameObject"),
            FieldSchema::scalar("m_Enabled", ValueKind::UInt8).aligned(),
            FieldSchema::pptr("m_Script", "MonoScript"),
            FieldSchema::string("m_Name"),
            FieldSchema::vector("m_fallbackFontAssets", FieldSchema::pptr("data", "TMP_FontAsset")),
        ],
    )
}

pub fn builtin(class: i32) -> Arc<FieldSchema> {
    ClassDatabase::builtin()
        .lookup(VERSION, class)
        .expect("built-in class layout")
}

pub fn mono_script(name: &str) -> Vec<u8> {
    let value = json!({
        "m_Name": name,
        "m_ExecutionOrder": 0,
        "m_ClassName": name,
        "m_Namespace": "TMPro",
        "m_AssemblyName": "Unity.TextMeshPro.dll",
    });
    encode(&builtin(class_id::MONO_SCRIPT), &value).expect("encode script")
}

/// Texture payload; an empty `stream_path` keeps the pixels embedded.
pub fn texture(name: &str, stream_path: &str) -> Vec<u8> {
    let embedded = stream_path.is_empty();
    let pixels: Vec<u8> = if embedded { vec![1, 2, 3, 4] } else { Vec::new() };
    let streamed: u32 = if embedded { 0 } else { 4 };
    let value = json!({
        "m_Name": name,
        "m_ForcedFallbackFormat": 4,
        "m_DownscaleFallback": false,
        "m_Width": 2,
        "m_Height": 2,
        "m_CompleteImageSize": 4,
        "m_TextureFormat": 1,
        "m_MipCount": 1,
        "m_IsReadable": false,
        "m_ImageCount": 1,
        "image data": {"Array": pixels},
        "m_StreamData": {"offset": 0, "size": streamed, "path": stream_path},
    });
    encode(&builtin(class_id::TEXTURE_2D), &value).expect("encode texture")
}

pub fn material_value(name: &str, shader: Value, main_tex: Value) -> Value {
    let env = |texture: Value| {
        json!({
            "m_Texture": texture,
            "m_Scale": {"x": 1.0, "y": 1.0},
            "m_Offset": {"x": 0.0, "y": 0.0},
        })
    };
    json!({
        "m_Name": name,
        "m_Shader": shader,
        "m_ShaderKeywords": "",
        "m_LightmapFlags": 4,
        "m_EnableInstancingVariants": false,
        "m_DoubleSidedGI": false,
        "m_CustomRenderQueue": -1,
        "m_SavedProperties": {
            "m_TexEnvs": {"Array": [
                {"first": "_FaceTex", "second": env(pptr(0, 0))},
                {"first": "_MainTex", "second": env(main_tex)},
            ]},
            "m_Floats": {"Array": [{"first": "_GradientScale", "second": 10.0}]},
            "m_Colors": {"Array": [
                {"first": "_FaceColor", "second": {"r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0}},
            ]},
        },
    })
}

pub fn material(name: &str, shader: Value, main_tex: Value) -> Vec<u8> {
    encode(&builtin(class_id::MATERIAL), &material_value(name, shader, main_tex)).expect("encode material")
}

/// Material layout of a newer runtime: the built-in tree plus a trailing flag.
pub fn extended_material_schema() -> Arc<FieldSchema> {
    let mut tree = (*builtin(class_id::MATERIAL)).clone();
    tree.children.push(FieldSchema::scalar("m_AllowLocking", ValueKind::Bool).aligned());
    Arc::new(tree)
}

pub fn extended_material(name: &str, shader: Value, main_tex: Value) -> Vec<u8> {
    let mut value = material_value(name, shader, main_tex);
    value["m_AllowLocking"] = json!(true);
    encode(&extended_material_schema(), &value).expect("encode extended material")
}

/// A font description, as a package would ship it.
pub fn font_value(name: &str, characters: &[u32], fallbacks: Vec<Value>) -> Value {
    let table: Vec<Value> = characters
        .iter()
        .enumerate()
        .map(|(glyph, c)| json!({"m_Unicode": c, "m_GlyphIndex": glyph}))
        .collect();
    json!({
        "m_GameObject": pptr(0, 0),
        "m_Enabled": 1,
        "m_Script": pptr(0, 0),
        "m_Name": name,
        "m_AtlasPopulationMode": 0,
        "m_SourceFontFile": pptr(0, 0),
        "material": pptr(0, 0),
        "m_AtlasTextures": {"Array": []},
        "m_CharacterTable": {"Array": table},
        "m_FallbackFontAssetTable": {"Array": fallbacks},
    })
}

pub struct FontRecord<'a> {
    pub script: Value,
    pub name: &'a str,
    pub material: Value,
    pub atlas: Value,
    pub characters: &'a [u32],
    pub fallbacks: Vec<Value>,
}

pub fn font(record: FontRecord<'_>) -> Vec<u8> {
    let mut value = font_value(record.name, record.characters, record.fallbacks);
    value["m_Script"] = record.script;
    value["material"] = record.material;
    value["m_AtlasTextures"] = json!({"Array": [record.atlas]});
    encode(&font_schema(), &value).expect("encode font")
}

pub fn settings(fallbacks: Vec<Value>) -> Vec<u8> {
    let value = json!({
        "m_GameObject": pptr(0, 0),
        "m_Enabled": 1,
        "m_Script": pptr(0, id(SETTINGS_SCRIPT)),
        "m_Name": "TMP Settings",
        "m_fallbackFontAssets": {"Array": fallbacks},
    });
    encode(&settings_schema(), &value).expect("encode settings")
}

/// The leaf container: scripts, one atlas and material, two fonts and the
/// settings record.
pub fn leaf_container() -> Container {
    build_leaf(false)
}

/// Leaf container whose Material type embeds [`extended_material_schema`].
pub fn leaf_container_extended_material() -> Container {
    build_leaf(true)
}

fn build_leaf(extended: bool) -> Container {
    let mut c = Container::new(LEAF_FILE, VERSION);
    let font_script = c.add_script_type(ObjectRef::local(id(FONT_SCRIPT))).expect("script type");
    let settings_script = c.add_script_type(ObjectRef::local(id(SETTINGS_SCRIPT))).expect("script type");

    let mono = c.add_type(TypeEntry::class(class_id::MONO_SCRIPT));
    let tex = c.add_type(TypeEntry::class(class_id::TEXTURE_2D));
    let mat = if extended {
        c.add_type(TypeEntry::class(class_id::MATERIAL).with_schema(extended_material_schema()))
    } else {
        c.add_type(TypeEntry::class(class_id::MATERIAL))
    };
    let font_type = c.add_type(
        TypeEntry::class(class_id::MONO_BEHAVIOUR)
            .with_script(font_script)
            .with_schema(Arc::new(font_schema())),
    );
    let settings_type = c.add_type(
        TypeEntry::class(class_id::MONO_BEHAVIOUR)
            .with_script(settings_script)
            .with_schema(Arc::new(settings_schema())),
    );

    assert_eq!(c.append_record(mono, mono_script("TMP_FontAsset")), FONT_SCRIPT);
    assert_eq!(c.append_record(mono, mono_script("TMP_Settings")), SETTINGS_SCRIPT);
    assert_eq!(c.append_record(tex, texture("Leaf Atlas", "")), LEAF_ATLAS);
    let leaf_material = if extended {
        extended_material("Leaf Material", pptr(0, SHADER_ID), pptr(0, id(LEAF_ATLAS)))
    } else {
        material("Leaf Material", pptr(0, SHADER_ID), pptr(0, id(LEAF_ATLAS)))
    };
    assert_eq!(c.append_record(mat, leaf_material), LEAF_MATERIAL);
    let liberation = font(FontRecord {
        script: pptr(0, id(FONT_SCRIPT)),
        name: "LiberationSans SDF",
        material: pptr(0, id(LEAF_MATERIAL)),
        atlas: pptr(0, id(LEAF_ATLAS)),
        characters: &[65, 66, 67],
        fallbacks: vec![pptr(0, id(LEAF_BITTER))],
    });
    assert_eq!(c.append_record(font_type, liberation), LEAF_LIBERATION);
    let bitter = font(FontRecord {
        script: pptr(0, id(FONT_SCRIPT)),
        name: "Bitter SDF",
        material: pptr(0, id(LEAF_MATERIAL)),
        atlas: pptr(0, id(LEAF_ATLAS)),
        characters: &[65, 0x4E00],
        fallbacks: vec![],
    });
    assert_eq!(c.append_record(font_type, bitter), LEAF_BITTER);
    assert_eq!(
        c.append_record(settings_type, settings(vec![pptr(0, id(LEAF_LIBERATION))])),
        SETTINGS
    );
    c
}

/// The dependent container. Its font script lives in the leaf.
pub fn dependent_container() -> Container {
    let mut c = Container::new(DEPENDENT_FILE, VERSION);
    c.add_external("library/unity default resources");
    assert_eq!(c.add_external("Library/Resources.assets"), LEAF_SELECTOR);
    let font_script = c
        .add_script_type(ObjectRef::new(LEAF_SELECTOR, id(FONT_SCRIPT)))
        .expect("script type");

    let tex = c.add_type(TypeEntry::class(class_id::TEXTURE_2D));
    let mat = c.add_type(TypeEntry::class(class_id::MATERIAL));
    let font_type = c.add_type(
        TypeEntry::class(class_id::MONO_BEHAVIOUR)
            .with_script(font_script)
            .with_schema(Arc::new(font_schema())),
    );

    assert_eq!(c.append_record(tex, texture("Shared Atlas", "")), DEP_ATLAS);
    assert_eq!(
        c.append_record(mat, material("Shared Material", pptr(0, SHADER_ID), pptr(0, id(DEP_ATLAS)))),
        DEP_MATERIAL
    );
    let liberation = font(FontRecord {
        script: pptr(LEAF_SELECTOR, id(FONT_SCRIPT)),
        name: "LiberationSans SDF",
        material: pptr(0, id(DEP_MATERIAL)),
        atlas: pptr(0, id(DEP_ATLAS)),
        characters: &[65, 68],
        fallbacks: vec![pptr(LEAF_SELECTOR, id(LEAF_LIBERATION)), pptr(0, id(DEP_ONLY))],
    });
    assert_eq!(c.append_record(font_type, liberation), DEP_LIBERATION);
    let only = font(FontRecord {
        script: pptr(LEAF_SELECTOR, id(FONT_SCRIPT)),
        name: "Shared Only SDF",
        material: pptr(0, id(DEP_MATERIAL)),
        atlas: pptr(0, id(DEP_ATLAS)),
        characters: &[70],
        fallbacks: vec![],
    });
    assert_eq!(c.append_record(font_type, only), DEP_ONLY);
    c
}

/// Raw Font payload: `name_len`-byte name, then 0xAB filler up to `size`.
pub fn raw_font(name_len: usize, size: usize) -> Vec<u8> {
    let mut data = vec![0xAB; size];
    data[..4].copy_from_slice(&(name_len as i32).to_le_bytes());
    for (i, b) in data[4..4 + name_len].iter_mut().enumerate() {
        *b = b'a' + i as u8;
    }
    data
}

/// A game data directory holding both containers.
pub struct Fixture {
    _dir: TempDir,
    pub data_dir: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(leaf_container(), dependent_container())
    }

    pub fn with(leaf: Container, dependent: Container) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let data_dir = dir.path().join("Game_Data");
        std::fs::create_dir(&data_dir).expect("data dir");
        leaf.write_file(data_dir.join(LEAF_FILE)).expect("write leaf");
        dependent.write_file(data_dir.join(DEPENDENT_FILE)).expect("write dependent");
        Self { _dir: dir, data_dir }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn open(&self) -> FontPatcher {
        FontPatcher::open_default(&self.data_dir).expect("open fixture")
    }

    pub fn root(&self) -> &Path {
        self.data_dir.parent().expect("fixture root")
    }
}
