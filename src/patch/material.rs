use tracing::debug;

use super::{FontPatcher, MAIN_TEXTURE};
use crate::codec::{decode, encode, FieldValue};
use crate::container::ObjectRef;
use crate::registry::{LogicalIndex, Side};
use crate::schema::{class_id, ARRAY_FIELD};
use crate::util::{Error, Result};

/// Bytes of the trailing stream data reference of a texture record.
const STREAM_DATA_TAIL: usize = 12;

impl FontPatcher {
    /// Append a raw Texture2D record.
    ///
    /// Pixel data must be embedded: the trailing stream data block
    /// (offset, size, empty path) has to be all zero.
    pub fn add_atlas(&mut self, data: Vec<u8>) -> Result<LogicalIndex> {
        let embedded = data.len() >= STREAM_DATA_TAIL
            && data[data.len() - STREAM_DATA_TAIL..].iter().all(|b| *b == 0);
        if !embedded {
            return Err(Error::UnsupportedPayloadShape(
                "atlas references external stream data; embed the pixel data in the texture first".into(),
            ));
        }
        self.registry.append_record(class_id::TEXTURE_2D, None, data)
    }

    /// Append a Material record sampling `atlas`.
    ///
    /// The shader reference is copied from the material of an existing leaf
    /// font and the `_MainTex` texture is pointed at `atlas`.
    pub fn add_material(&mut self, data: Vec<u8>, atlas: LogicalIndex) -> Result<LogicalIndex> {
        if !atlas.is_leaf() {
            return Err(Error::CrossContainerNotAllowed(format!(
                "material atlas {atlas} must live in {}",
                self.registry.container(Side::Leaf).name()
            )));
        }
        let registry = &self.registry;
        let atlas_id = registry.object_id(atlas)?;

        let schema = registry.append_schema(class_id::MATERIAL, None)?;
        let mut value = decode(&schema, &data)?;

        let shader = template_shader(self)?;
        value.set("m_Shader", shader);

        let texture = value
            .at_mut(&["m_SavedProperties", "m_TexEnvs", ARRAY_FIELD])
            .and_then(FieldValue::as_array_mut)
            .and_then(|envs| {
                envs.iter_mut()
                    .find(|env| env.get("first").and_then(FieldValue::as_str) == Some(MAIN_TEXTURE))
            })
            .and_then(|env| env.at_mut(&["second", "m_Texture"]))
            .ok_or_else(|| Error::not_found(format!("{MAIN_TEXTURE} texture environment in material")))?;
        ObjectRef::local(atlas_id).write_field(texture)?;

        let bytes = encode(&schema, &value)?;
        let index = self.registry.append_record(class_id::MATERIAL, None, bytes)?;
        debug!("material {index} samples atlas {atlas}");
        Ok(index)
    }
}

/// Shader reference of the first leaf font's material.
fn template_shader(patcher: &FontPatcher) -> Result<FieldValue> {
    let registry = patcher.registry();
    let (font, value) = registry
        .first_font(Side::Leaf)
        .ok_or_else(|| Error::not_found("leaf font to copy a shader from"))?;
    let reference = value
        .get("material")
        .map(ObjectRef::from_field)
        .transpose()?
        .ok_or_else(|| Error::corrupt(format!("font {font} has no material")))?;
    let material = registry
        .resolve_reference(Side::Leaf, reference)
        .ok_or_else(|| Error::not_found(format!("material {reference} of font {font}")))?;
    registry
        .decoded_field(material)?
        .get("m_Shader")
        .cloned()
        .ok_or_else(|| Error::corrupt(format!("material {material} has no shader")))
}
