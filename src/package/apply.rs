//! Maps a package onto patch operations.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use super::jsonc;
use super::manifest::{Manifest, MANIFEST_FILE};
use super::source::PackageSource;
use crate::patch::FontPatcher;
use crate::registry::{LogicalIndex, Side};
use crate::util::{Error, Result};

/// What a package run changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub source_fonts: Vec<LogicalIndex>,
    pub atlases: Vec<LogicalIndex>,
    pub materials: Vec<LogicalIndex>,
    /// Font records rewritten, in replacement order.
    pub replaced: Vec<LogicalIndex>,
    /// Font names in `fontReplacements` that matched nothing.
    pub missing: Vec<String>,
    /// Codepoints selected for removal.
    pub removed_characters: usize,
    /// Fonts that lost at least one character.
    pub trimmed_fonts: usize,
}

/// Apply every section of the package manifest. Does not save.
pub fn apply_package(patcher: &mut FontPatcher, package: &mut PackageSource) -> Result<ApplySummary> {
    let manifest = Manifest::from_slice(package.read(MANIFEST_FILE)?)?;
    let mut summary = ApplySummary::default();

    for entry in &manifest.source_font_files {
        let data = package.read(&entry.path)?.to_vec();
        summary.source_fonts.push(patcher.add_font_file(data)?);
    }
    for entry in &manifest.atlases {
        let data = package.read(&entry.path)?.to_vec();
        summary.atlases.push(patcher.add_atlas(data)?);
    }
    for entry in &manifest.materials {
        let data = package.read(&entry.path)?.to_vec();
        let atlas = summary.atlases[entry.atlas];
        summary.materials.push(patcher.add_material(data, atlas)?);
    }

    let mut excluded: HashSet<LogicalIndex> = HashSet::new();
    if !manifest.font_replacements.is_empty() {
        info!("replacing fonts");
        let names = patcher.registry().font_names();
        // One encoded result per (container, manifest font), copied onto
        // further fonts of the same name in that container.
        let mut applied: HashMap<(Side, usize), LogicalIndex> = HashMap::new();

        for (name, &font_index) in &manifest.font_replacements {
            let Some(targets) = names.get(name) else {
                warn!("font not found: {name}");
                summary.missing.push(name.clone());
                continue;
            };
            for &target in targets {
                match applied.get(&(target.side(), font_index)) {
                    Some(&done) => patcher.registry_mut().clone_payload(done, target)?,
                    None => {
                        let font = &manifest.fonts[font_index];
                        let material = summary.materials[font.material];
                        let atlas = summary.atlases[manifest.materials[font.material].atlas];
                        let source = font.source_font.map(|s| summary.source_fonts[s]);
                        let desc = jsonc::from_slice(package.read(&font.path)?)?;
                        patcher.replace_font(target, desc, atlas, material, source)?;
                        applied.insert((target.side(), font_index), target);
                    }
                }
                excluded.insert(target);
                summary.replaced.push(target);
                info!("replaced: {name} ({target})");
            }
        }
    }

    if let Some(rc) = &manifest.remove_characters {
        let names = patcher.registry().font_names();
        let lookup = |name: &String| {
            names
                .get(name)
                .ok_or_else(|| Error::not_found(format!("font {name} named in removeCharacters")))
        };

        let mut characters: HashSet<u32> = rc.from_characters.iter().copied().collect();
        for name in &rc.from_font {
            let font = lookup(name)?[0];
            characters.extend(patcher.characters(font)?);
        }

        if !rc.exclude_replaced {
            excluded.clear();
        }
        for name in &rc.exclude_fonts {
            excluded.extend(lookup(name)?.iter().copied());
        }

        let targets: Vec<LogicalIndex> = patcher
            .registry()
            .fonts()
            .keys()
            .filter(|i| !excluded.contains(i))
            .copied()
            .collect();
        info!("removing {} characters in {} fonts", characters.len(), targets.len());
        summary.removed_characters = characters.len();
        if !characters.is_empty() {
            summary.trimmed_fonts = patcher.remove_characters(targets, &characters)?;
        }
    }

    Ok(summary)
}
