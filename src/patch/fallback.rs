use crate::codec::FieldValue;
use crate::container::ObjectRef;
use crate::registry::{LogicalIndex, Side, NAME_FIELD};
use crate::schema::ARRAY_FIELD;
use crate::util::{Error, Result};

use super::FontPatcher;

const GLOBAL_FALLBACKS: &str = "m_fallbackFontAssets";
const FONT_FALLBACKS: &str = "m_FallbackFontAssetTable";

impl FontPatcher {
    /// Human-readable listing of the global and per-font fallback chains.
    ///
    /// # Panics
    ///
    /// Panics on a reference whose selector names neither the referencing
    /// container nor the leaf dependency slot.
    pub fn dump_fallback_graph(&mut self) -> Result<String> {
        let mut lines = Vec::new();

        let script = self.registry.config().settings_script.clone();
        let mut settings = None;
        for side in Side::ALL {
            let first = match self.registry.records_of_type(side, &script, 0) {
                Ok(mut records) => records.next().transpose()?,
                Err(Error::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            if first.is_some() {
                settings = first;
                break;
            }
        }

        match settings {
            Some(record) => {
                lines.push(format!("Global fallbacks ({script} {}):", record.index));
                self.describe_list(&mut lines, record.index.side(), &record.value, GLOBAL_FALLBACKS);
            }
            None => lines.push(format!("Global fallbacks: no {script} record")),
        }

        for (index, font) in self.registry.fonts() {
            lines.push(format!("{index} {}:", font_name(font)));
            self.describe_list(&mut lines, index.side(), font, FONT_FALLBACKS);
        }

        lines.push(String::new());
        Ok(lines.join("\n"))
    }

    fn describe_list(&self, lines: &mut Vec<String>, from: Side, value: &FieldValue, field: &str) {
        let Some(items) = value.at(&[field, ARRAY_FIELD]).and_then(FieldValue::as_array) else {
            lines.push(format!("    <no {field}>"));
            return;
        };
        for item in items {
            let line = match ObjectRef::from_field(item) {
                Ok(reference) => match self.find_font(from, reference) {
                    Some(index) => {
                        let name = self.registry.font(index).map(font_name).unwrap_or_default();
                        format!("    {index} {name}")
                    }
                    None => format!("    {reference} <not a tracked font>"),
                },
                Err(_) => "    <malformed reference>".to_string(),
            };
            lines.push(line);
        }
    }

    /// Linear search of the font cache for the record `reference` names.
    fn find_font(&self, from: Side, reference: ObjectRef) -> Option<LogicalIndex> {
        let registry = &self.registry;
        let origin = match (from, reference.selector) {
            (side, 0) => side,
            (Side::Dependent, s) if s == registry.dependency_selector() => Side::Leaf,
            (side, s) => {
                panic!(
                    "reference {reference} in {} uses unknown selector {s}",
                    registry.container(side).name()
                )
            }
        };
        registry
            .fonts()
            .keys()
            .find(|i| i.side() == origin && registry.object_id(**i).ok() == Some(reference.object_id))
            .copied()
    }
}

fn font_name(font: &FieldValue) -> String {
    font.get(NAME_FIELD)
        .and_then(FieldValue::as_str)
        .unwrap_or("<unnamed>")
        .to_string()
}
