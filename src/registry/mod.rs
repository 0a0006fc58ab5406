//! Two-container registry.
//!
//! The registry owns the leaf and the dependent container, their dirty
//! flags, the schema source, and a cache of decoded font records keyed by
//! [`LogicalIndex`]. Every read and write of a record goes through it so the
//! reference discipline between the two containers is checked in one place.

mod config;
mod index;
mod persist;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, info, trace};

pub use config::SessionConfig;
pub use index::{LogicalIndex, Side};

use crate::codec::{decode, FieldValue};
use crate::container::{Container, ObjectRef, RecordInfo, TypeEntry};
use crate::schema::{class_name, FieldSchema, SchemaSource, TypeTreeSchemas};
use crate::util::{Error, Result};

/// Field holding a script-backed record's script reference.
pub const SCRIPT_FIELD: &str = "m_Script";

/// Field holding a record's display name.
pub const NAME_FIELD: &str = "m_Name";

/// Per-container state.
struct Slot {
    container: Container,
    dirty: bool,
    font_script: Option<u16>,
    script_names: HashMap<u16, Option<String>>,
}

impl Slot {
    fn new(container: Container) -> Self {
        Self {
            container,
            dirty: false,
            font_script: None,
            script_names: HashMap::new(),
        }
    }
}

/// One record yielded by [`Registry::records_of_type`].
#[derive(Clone, Debug)]
pub struct TypedRecord {
    pub index: LogicalIndex,
    pub object_id: i64,
    pub value: FieldValue,
}

/// The leaf and dependent containers of one session.
pub struct Registry {
    config: SessionConfig,
    slots: [Slot; 2],
    schemas: Box<dyn SchemaSource>,
    dependency_selector: i32,
    fonts: BTreeMap<LogicalIndex, FieldValue>,
}

impl Registry {
    /// Open both containers from a data directory.
    pub fn open(data_dir: impl AsRef<Path>, config: SessionConfig, schemas: Box<dyn SchemaSource>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let dependent = Container::open(data_dir.join(&config.dependent_file))?;
        let leaf = Container::open(data_dir.join(&config.leaf_file))?;
        Self::from_containers(leaf, dependent, config, schemas)
    }

    /// Open both containers with the built-in class layouts.
    pub fn open_default(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(data_dir, SessionConfig::default(), Box::new(TypeTreeSchemas::default()))
    }

    /// Build a registry over already loaded containers and load fonts.
    pub fn from_containers(
        leaf: Container,
        dependent: Container,
        config: SessionConfig,
        schemas: Box<dyn SchemaSource>,
    ) -> Result<Self> {
        let dependency_selector = dependent.dependency_selector(&config.leaf_file).ok_or_else(|| {
            Error::corrupt(format!(
                "{} does not list {} as a dependency",
                dependent.name(),
                config.leaf_file
            ))
        })?;

        let mut registry = Self {
            config,
            slots: [Slot::new(leaf), Slot::new(dependent)],
            schemas,
            dependency_selector,
            fonts: BTreeMap::new(),
        };
        for side in Side::ALL {
            registry.load_fonts(side)?;
        }
        info!(
            "loaded {} fonts ({} leaf, {} dependent)",
            registry.fonts.len(),
            registry.fonts.keys().filter(|i| i.is_leaf()).count(),
            registry.fonts.keys().filter(|i| !i.is_leaf()).count()
        );
        Ok(registry)
    }

    fn load_fonts(&mut self, side: Side) -> Result<()> {
        let name = self.config.font_script.clone();
        let hint = self.config.font_hint(side);
        let script = match self.resolve_record_type(side, &name, hint) {
            Ok(script) => script,
            Err(Error::NotFound(_)) => {
                debug!("{} has no {} script type", self.container(side).name(), name);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.slots[side.slot()].font_script = Some(script);

        let records: Vec<TypedRecord> = self.records_with_script(side, script).collect::<Result<_>>()?;
        debug!("{}: {} {} records", self.container(side).name(), records.len(), name);
        for record in records {
            self.fonts.insert(record.index, record.value);
        }
        Ok(())
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn schemas(&self) -> &dyn SchemaSource {
        self.schemas.as_ref()
    }

    pub fn container(&self, side: Side) -> &Container {
        &self.slots[side.slot()].container
    }

    pub(crate) fn container_mut(&mut self, side: Side) -> &mut Container {
        &mut self.slots[side.slot()].container
    }

    /// True when `side` has unsaved changes.
    pub fn is_dirty(&self, side: Side) -> bool {
        self.slots[side.slot()].dirty
    }

    pub(crate) fn mark_dirty(&mut self, side: Side) {
        self.slots[side.slot()].dirty = true;
    }

    /// Selector the dependent container uses for leaf records.
    pub fn dependency_selector(&self) -> i32 {
        self.dependency_selector
    }

    /// Decoded font records.
    pub fn fonts(&self) -> &BTreeMap<LogicalIndex, FieldValue> {
        &self.fonts
    }

    pub fn font(&self, index: LogicalIndex) -> Result<&FieldValue> {
        self.fonts
            .get(&index)
            .ok_or_else(|| Error::not_found(format!("font at logical index {index}")))
    }

    pub(crate) fn fonts_mut(&mut self) -> &mut BTreeMap<LogicalIndex, FieldValue> {
        &mut self.fonts
    }

    /// Reference to the font script for records in `side`.
    pub fn font_script_ref(&self, side: Side) -> Result<ObjectRef> {
        let slot = &self.slots[side.slot()];
        slot.font_script
            .and_then(|i| slot.container.script_types().get(usize::from(i)).copied())
            .ok_or_else(|| {
                Error::not_found(format!("{} script type in {}", self.config.font_script, slot.container.name()))
            })
    }

    /// Map a reference stored in `from` to the record it points at.
    ///
    /// References into containers other than the two tracked ones resolve
    /// to `None`.
    pub fn resolve_reference(&self, from: Side, reference: ObjectRef) -> Option<LogicalIndex> {
        if reference.is_null() {
            return None;
        }
        let target = match (from, reference.selector) {
            (side, 0) => side,
            (Side::Dependent, s) if s == self.dependency_selector => Side::Leaf,
            _ => return None,
        };
        self.container(target)
            .position_of(reference.object_id)
            .map(|pos| target.at(pos))
    }

    /// Name of a script type, decoded from its script record and cached.
    fn script_name(&mut self, side: Side, script: u16) -> Result<Option<String>> {
        if let Some(name) = self.slots[side.slot()].script_names.get(&script) {
            return Ok(name.clone());
        }

        let reference = self
            .container(side)
            .script_types()
            .get(usize::from(script))
            .copied()
            .ok_or_else(|| Error::not_found(format!("script type {script}")))?;
        let name = match self.resolve_reference(side, reference) {
            Some(target) => {
                let value = self.decode_record(target)?;
                value.get(NAME_FIELD).and_then(FieldValue::as_str).map(str::to_owned)
            }
            None => None,
        };
        trace!("{} script {script} -> {:?}", self.container(side).name(), name);
        self.slots[side.slot()].script_names.insert(script, name.clone());
        Ok(name)
    }

    /// Find the script type named `type_name`, trying `hint` first.
    ///
    /// Names are unique within a container, so the result is the same as a
    /// plain scan from the start.
    pub fn resolve_record_type(&mut self, side: Side, type_name: &str, hint: usize) -> Result<u16> {
        let count = self.container(side).script_types().len();
        let start = if hint < count { hint } else { 0 };
        for i in (start..count).chain(0..start) {
            let script = u16::try_from(i).map_err(|_| Error::corrupt("script type table exceeds u16"))?;
            if self.script_name(side, script)?.as_deref() == Some(type_name) {
                return Ok(script);
            }
        }
        Err(Error::not_found(format!(
            "script type {type_name} in {}",
            self.container(side).name()
        )))
    }

    /// Lazily decode every record of script type `type_name` in `side`.
    pub fn records_of_type(
        &mut self,
        side: Side,
        type_name: &str,
        hint: usize,
    ) -> Result<impl Iterator<Item = Result<TypedRecord>> + '_> {
        let script = self.resolve_record_type(side, type_name, hint)?;
        Ok(self.records_with_script(side, script))
    }

    fn records_with_script(&self, side: Side, script: u16) -> impl Iterator<Item = Result<TypedRecord>> + '_ {
        let container = self.container(side);
        let expected = container.script_types().get(usize::from(script)).copied();
        container
            .records()
            .enumerate()
            .filter(move |(_, record)| {
                container
                    .types()
                    .get(record.type_index)
                    .is_some_and(|t| t.script_index == Some(script))
            })
            .map(move |(pos, record)| {
                let index = side.at(pos);
                let value = self.decode_record(index)?;
                let actual = value.get(SCRIPT_FIELD).map(ObjectRef::from_field).transpose()?;
                if actual.is_none() || actual != expected {
                    return Err(Error::corrupt(format!(
                        "record {} in {} claims script {:?} but its type says {:?}",
                        record.object_id,
                        container.name(),
                        actual,
                        expected
                    )));
                }
                Ok(TypedRecord { index, object_id: record.object_id, value })
            })
    }

    /// Record metadata.
    pub fn record(&self, index: LogicalIndex) -> Result<&RecordInfo> {
        let container = self.container(index.side());
        container.record(index.position()).ok_or_else(|| {
            Error::not_found(format!("record {index} in {} ({} records)", container.name(), container.record_count()))
        })
    }

    pub fn object_id(&self, index: LogicalIndex) -> Result<i64> {
        Ok(self.record(index)?.object_id)
    }

    pub fn class_id(&self, index: LogicalIndex) -> Result<i32> {
        Ok(self.container(index.side()).record_type(index.position())?.class_id)
    }

    /// Current payload bytes.
    pub fn payload(&self, index: LogicalIndex) -> Result<&[u8]> {
        self.container(index.side()).payload(index.position())
    }

    /// Layout of a record.
    pub fn schema_of(&self, index: LogicalIndex) -> Result<Arc<FieldSchema>> {
        self.schemas.schema(self.container(index.side()), index.position())
    }

    fn decode_record(&self, index: LogicalIndex) -> Result<FieldValue> {
        let schema = self.schema_of(index)?;
        decode(&schema, self.payload(index)?)
    }

    /// Decoded record, served from the font cache when present.
    pub fn decoded_field(&self, index: LogicalIndex) -> Result<Cow<'_, FieldValue>> {
        match self.fonts.get(&index) {
            Some(value) => Ok(Cow::Borrowed(value)),
            None => self.decode_record(index).map(Cow::Owned),
        }
    }

    /// Reference a record in `from` would store to point at `to`.
    pub fn reference_for(&self, from: Side, to: LogicalIndex) -> Result<ObjectRef> {
        let object_id = self.object_id(to)?;
        match (from, to.side()) {
            (a, b) if a == b => Ok(ObjectRef::local(object_id)),
            (Side::Dependent, Side::Leaf) => Ok(ObjectRef::new(self.dependency_selector, object_id)),
            _ => Err(Error::InvalidCrossReference {
                from: self.container(from).name().to_string(),
                to: self.container(to.side()).name().to_string(),
            }),
        }
    }

    /// Layout a record appended as `class_id`/`script_index` will be read with.
    ///
    /// The tree embedded in an existing leaf type entry wins over the class
    /// catalog, since [`append_record`](Self::append_record) reuses that entry.
    pub fn append_schema(&self, class_id: i32, script_index: Option<u16>) -> Result<Arc<FieldSchema>> {
        let leaf = self.container(Side::Leaf);
        let embedded = leaf
            .find_type(class_id, script_index)
            .and_then(|t| leaf.types()[t].schema.clone());
        if let Some(schema) = embedded {
            return Ok(schema);
        }
        self.schemas.class_schema(leaf.version(), class_id).ok_or_else(|| {
            Error::not_found(format!("{} layout for runtime {}", class_name(class_id), leaf.version()))
        })
    }

    /// Append a record to the leaf container.
    ///
    /// A type entry for `class_id`/`script_index` is created when missing,
    /// embedding the class layout when the schema source knows it.
    pub fn append_record(&mut self, class_id: i32, script_index: Option<u16>, payload: Vec<u8>) -> Result<LogicalIndex> {
        let version = self.container(Side::Leaf).version().to_string();
        let schema = self.schemas.class_schema(&version, class_id);
        let leaf = self.container_mut(Side::Leaf);
        let type_index = match leaf.find_type(class_id, script_index) {
            Some(t) => t,
            None => {
                let mut entry = TypeEntry { class_id, script_index, schema: None };
                if let Some(schema) = schema {
                    entry = entry.with_schema(schema);
                }
                leaf.add_type(entry)
            }
        };
        let size = payload.len();
        let position = leaf.append_record(type_index, payload);
        let object_id = leaf.max_object_id();
        self.mark_dirty(Side::Leaf);

        let index = Side::Leaf.at(position);
        debug!("appended {} {index} (id {object_id}, {size} bytes)", class_name(class_id));
        Ok(index)
    }

    /// Install a replacement payload and mark its container dirty.
    pub fn set_payload(&mut self, index: LogicalIndex, payload: Vec<u8>) -> Result<()> {
        self.container_mut(index.side()).set_payload(index.position(), payload)?;
        self.mark_dirty(index.side());
        Ok(())
    }

    /// Re-decode a record into the font cache.
    pub fn refresh_font(&mut self, index: LogicalIndex) -> Result<()> {
        let value = self.decode_record(index)?;
        self.fonts.insert(index, value);
        Ok(())
    }

    /// Copy the payload of `source` onto `target` in the same container.
    pub fn clone_payload(&mut self, source: LogicalIndex, target: LogicalIndex) -> Result<()> {
        if source.side() != target.side() {
            return Err(Error::CrossContainerNotAllowed(format!(
                "cannot copy record {source} onto {target} in another container"
            )));
        }
        let bytes = self.payload(source)?.to_vec();
        self.set_payload(target, bytes)?;
        if let Some(value) = self.fonts.get(&source).cloned() {
            self.fonts.insert(target, value);
        }
        Ok(())
    }

    /// Font records grouped by name.
    pub fn font_names(&self) -> HashMap<String, SmallVec<[LogicalIndex; 2]>> {
        let mut names: HashMap<String, SmallVec<[LogicalIndex; 2]>> = HashMap::with_capacity(self.fonts.len());
        for (index, value) in &self.fonts {
            let name = value.get(NAME_FIELD).and_then(FieldValue::as_str).unwrap_or_default();
            names.entry(name.to_string()).or_default().push(*index);
        }
        names
    }

    /// Fail with `TypeMismatch` unless the record is of class `expected`.
    pub fn expect_class(&self, index: LogicalIndex, expected: i32) -> Result<()> {
        let actual = self.class_id(index)?;
        if actual != expected {
            return Err(Error::TypeMismatch {
                expected: class_name(expected).to_string(),
                actual: format!("{} (class {actual}) at {index}", class_name(actual)),
            });
        }
        Ok(())
    }

    /// First cached font in `side`.
    pub fn first_font(&self, side: Side) -> Option<(LogicalIndex, &FieldValue)> {
        self.fonts
            .iter()
            .find(|(i, _)| i.side() == side)
            .map(|(i, v)| (*i, v))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("leaf", &self.container(Side::Leaf))
            .field("dependent", &self.container(Side::Dependent))
            .field("dependency_selector", &self.dependency_selector)
            .field("fonts", &self.fonts.len())
            .finish()
    }
}
