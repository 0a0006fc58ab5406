use std::collections::HashSet;

use tracing::{debug, info};

use super::FontPatcher;
use crate::codec::{encode, FieldValue};
use crate::registry::LogicalIndex;
use crate::schema::ARRAY_FIELD;
use crate::util::{Error, Result};

const CHARACTER_TABLE: [&str; 2] = ["m_CharacterTable", ARRAY_FIELD];

fn unicode(character: &FieldValue) -> Option<u32> {
    character
        .get("m_Unicode")
        .and_then(FieldValue::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

fn table(index: LogicalIndex, font: &FieldValue) -> Result<&[FieldValue]> {
    font.at(&CHARACTER_TABLE)
        .and_then(FieldValue::as_array)
        .ok_or_else(|| Error::corrupt(format!("font {index} has no character table")))
}

impl FontPatcher {
    /// Codepoints in a font's character table.
    pub fn characters(&self, index: LogicalIndex) -> Result<Vec<u32>> {
        let font = self.registry.font(index)?;
        Ok(table(index, font)?.iter().filter_map(unicode).collect())
    }

    /// Drop every character in `remove` from the given fonts.
    ///
    /// Fonts that lose nothing are left untouched. Returns the number of
    /// fonts rewritten.
    pub fn remove_characters<I>(&mut self, fonts: I, remove: &HashSet<u32>) -> Result<usize>
    where
        I: IntoIterator<Item = LogicalIndex>,
    {
        let mut changed = 0;
        for index in fonts {
            let font = self.registry.font(index)?;
            let hits = table(index, font)?
                .iter()
                .filter(|c| unicode(c).is_some_and(|u| remove.contains(&u)))
                .count();
            if hits == 0 {
                continue;
            }

            let mut font = font.clone();
            if let Some(list) = font.at_mut(&CHARACTER_TABLE).and_then(FieldValue::as_array_mut) {
                list.retain(|c| !unicode(c).is_some_and(|u| remove.contains(&u)));
            }
            let schema = self.registry.schema_of(index)?;
            let bytes = encode(&schema, &font)?;
            self.registry.set_payload(index, bytes)?;
            self.registry.fonts_mut().insert(index, font);

            debug!("font {index}: removed {hits} characters");
            changed += 1;
        }
        info!("removed characters from {changed} fonts");
        Ok(changed)
    }
}
