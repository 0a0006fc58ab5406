use serde_json::{Map, Value};
use tracing::info;

use super::{FontPatcher, DYNAMIC_POPULATION};
use crate::codec::encode;
use crate::container::ObjectRef;
use crate::registry::{LogicalIndex, Side, NAME_FIELD, SCRIPT_FIELD};
use crate::schema::{class_id, ARRAY_FIELD};
use crate::util::{align4, Error, Result};

const REFERENCE_SIZE: usize = 12;

impl FontPatcher {
    /// Append a raw Font record with its default material and texture cleared.
    ///
    /// The payload starts with `m_Name` (`i32` length + bytes), then
    /// `m_LineSpacing`, the default material reference, `m_FontSize` and the
    /// texture reference.
    pub fn add_font_file(&mut self, mut data: Vec<u8>) -> Result<LogicalIndex> {
        let name_len = data
            .get(..4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Error::UnsupportedPayloadShape("font payload has no name".into()))?;

        let material = align4(4 + name_len + 4);
        let texture = material + REFERENCE_SIZE + 4;
        if data.len() < texture + REFERENCE_SIZE {
            return Err(Error::UnsupportedPayloadShape(format!(
                "font payload of {} bytes is too short for a {name_len}-byte name",
                data.len()
            )));
        }
        data[material..material + REFERENCE_SIZE].fill(0);
        data[texture..texture + REFERENCE_SIZE].fill(0);

        self.registry.append_record(class_id::FONT, None, data)
    }

    /// Rewrite a font record from a structured description.
    ///
    /// The description's script, material, atlas and source font references
    /// are replaced with references valid from the font's container before it
    /// is encoded with the record's own layout.
    pub fn replace_font(
        &mut self,
        index: LogicalIndex,
        mut desc: Value,
        atlas: LogicalIndex,
        material: LogicalIndex,
        source_font: Option<LogicalIndex>,
    ) -> Result<()> {
        let registry = &mut self.registry;
        registry.font(index)?;
        let side = index.side();

        if side == Side::Leaf {
            let outside = [Some(atlas), Some(material), source_font]
                .into_iter()
                .flatten()
                .find(|i| !i.is_leaf());
            if let Some(outside) = outside {
                return Err(Error::CrossContainerNotAllowed(format!(
                    "font {index} in {} cannot reference {outside} in {}",
                    registry.container(Side::Leaf).name(),
                    registry.container(Side::Dependent).name()
                )));
            }
        }

        let fields = desc
            .as_object_mut()
            .ok_or_else(|| Error::value_type("Base", "object"))?;

        let dynamic = fields.get("m_AtlasPopulationMode").and_then(Value::as_i64) == Some(DYNAMIC_POPULATION);
        let source_ref = if dynamic {
            let source = source_font
                .ok_or_else(|| Error::not_found(format!("source font for dynamic font {index}")))?;
            registry.expect_class(source, class_id::FONT)?;
            registry.reference_for(side, source)?
        } else {
            ObjectRef::NULL
        };
        source_ref.write_json(field(fields, "m_SourceFontFile"));

        registry.font_script_ref(side)?.write_json(field(fields, SCRIPT_FIELD));
        registry.reference_for(side, material)?.write_json(field(fields, "material"));

        let atlas_ref = registry.reference_for(side, atlas)?.to_json();
        let textures = field(fields, "m_AtlasTextures");
        match textures.as_object_mut() {
            Some(map) => {
                map.insert(ARRAY_FIELD.into(), Value::Array(vec![atlas_ref]));
            }
            None => {
                let mut map = Map::new();
                map.insert(ARRAY_FIELD.into(), Value::Array(vec![atlas_ref]));
                *textures = Value::Object(map);
            }
        }

        let schema = registry.schema_of(index)?;
        let bytes = encode(&schema, &desc)?;
        let size = bytes.len();
        registry.set_payload(index, bytes)?;
        registry.refresh_font(index)?;

        let name = registry
            .font(index)?
            .get(NAME_FIELD)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        info!("replaced font {index} {name:?} ({size} bytes)");
        Ok(())
    }
}

/// Field of a description object, created as `null` when absent.
fn field<'a>(fields: &'a mut Map<String, Value>, name: &str) -> &'a mut Value {
    fields.entry(name).or_insert(Value::Null)
}
