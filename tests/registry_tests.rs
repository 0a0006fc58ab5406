//! Integration tests for loading, addressing and saving the two containers.

mod common;

use common::*;
use fontpatch::codec::FieldValue;
use fontpatch::container::{Container, ObjectRef};
use fontpatch::registry::{Registry, SessionConfig, Side};
use fontpatch::schema::TypeTreeSchemas;
use fontpatch::{Error, LogicalIndex};

fn font_name(registry: &Registry, index: LogicalIndex) -> String {
    registry
        .font(index)
        .expect("font")
        .get("m_Name")
        .and_then(FieldValue::as_str)
        .expect("name")
        .to_string()
}

fn from_containers(leaf: Container, dependent: Container) -> fontpatch::Result<Registry> {
    Registry::from_containers(
        leaf,
        dependent,
        SessionConfig::default(),
        Box::new(TypeTreeSchemas::default()),
    )
}

#[test]
fn test_loads_fonts_from_both_containers() {
    let fixture = Fixture::new();
    let patcher = fixture.open();
    let registry = patcher.registry();

    let keys: Vec<LogicalIndex> = registry.fonts().keys().copied().collect();
    assert_eq!(
        keys,
        vec![
            leaf(LEAF_BITTER),
            leaf(LEAF_LIBERATION),
            dependent(DEP_LIBERATION),
            dependent(DEP_ONLY)
        ],
        "fonts are ordered by signed index"
    );
    assert_eq!(font_name(registry, leaf(LEAF_BITTER)), "Bitter SDF");
    assert_eq!(font_name(registry, dependent(DEP_ONLY)), "Shared Only SDF");
    assert!(!registry.is_dirty(Side::Leaf));
    assert!(!registry.is_dirty(Side::Dependent));
}

#[test]
fn test_logical_index_addresses_every_record() {
    let fixture = Fixture::new();
    let patcher = fixture.open();
    let registry = patcher.registry();

    for side in Side::ALL {
        let container = registry.container(side);
        for (position, record) in container.records().enumerate() {
            let index = side.at(position);
            assert_eq!(LogicalIndex::from_signed(index.to_signed()), index);
            assert_eq!(index.to_signed().to_string().parse::<LogicalIndex>().unwrap(), index);
            assert_eq!(registry.object_id(index).unwrap(), record.object_id);
            assert_eq!(
                registry.resolve_reference(side, ObjectRef::local(record.object_id)),
                Some(index)
            );
        }
    }
    assert_eq!(leaf(0).to_signed(), -1);
    assert_eq!(dependent(0).to_signed(), 0);
    assert!(matches!(registry.record(leaf(99)), Err(Error::NotFound(_))));
}

#[test]
fn test_dependency_selector_resolution() {
    let fixture = Fixture::new();
    let patcher = fixture.open();
    let registry = patcher.registry();

    assert_eq!(registry.dependency_selector(), LEAF_SELECTOR);

    let into_leaf = ObjectRef::new(LEAF_SELECTOR, id(LEAF_LIBERATION));
    assert_eq!(
        registry.resolve_reference(Side::Dependent, into_leaf),
        Some(leaf(LEAF_LIBERATION))
    );
    // The leaf has no dependencies of its own.
    assert_eq!(registry.resolve_reference(Side::Leaf, into_leaf), None);
    // Slot 1 is another container entirely.
    assert_eq!(
        registry.resolve_reference(Side::Dependent, ObjectRef::new(1, id(LEAF_LIBERATION))),
        None
    );
    assert_eq!(registry.resolve_reference(Side::Dependent, ObjectRef::NULL), None);
}

#[test]
fn test_reference_for_respects_direction() {
    let fixture = Fixture::new();
    let patcher = fixture.open();
    let registry = patcher.registry();

    assert_eq!(
        registry.reference_for(Side::Leaf, leaf(LEAF_ATLAS)).unwrap(),
        ObjectRef::local(id(LEAF_ATLAS))
    );
    assert_eq!(
        registry.reference_for(Side::Dependent, leaf(LEAF_ATLAS)).unwrap(),
        ObjectRef::new(LEAF_SELECTOR, id(LEAF_ATLAS))
    );
    assert_eq!(
        registry.reference_for(Side::Dependent, dependent(DEP_ATLAS)).unwrap(),
        ObjectRef::local(id(DEP_ATLAS))
    );
    let err = registry.reference_for(Side::Leaf, dependent(DEP_ATLAS)).unwrap_err();
    assert!(matches!(err, Error::InvalidCrossReference { .. }), "{err}");
}

#[test]
fn test_font_names_group_duplicates() {
    let fixture = Fixture::new();
    let patcher = fixture.open();
    let names = patcher.registry().font_names();

    assert_eq!(names.len(), 3);
    assert_eq!(
        names["LiberationSans SDF"].as_slice(),
        &[leaf(LEAF_LIBERATION), dependent(DEP_LIBERATION)]
    );
    assert_eq!(names["Bitter SDF"].as_slice(), &[leaf(LEAF_BITTER)]);
}

#[test]
fn test_records_of_type() {
    let fixture = Fixture::new();
    let mut patcher = fixture.open();
    let registry = patcher.registry_mut();

    let settings: Vec<_> = registry
        .records_of_type(Side::Leaf, "TMP_Settings", 0)
        .unwrap()
        .collect::<fontpatch::Result<_>>()
        .unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].index, leaf(SETTINGS));
    assert_eq!(settings[0].object_id, id(SETTINGS));

    // Hint past the table still finds the type.
    let fonts = registry.records_of_type(Side::Dependent, "TMP_FontAsset", 1000).unwrap().count();
    assert_eq!(fonts, 2);

    assert!(matches!(
        registry.records_of_type(Side::Dependent, "TMP_Settings", 0).map(|_| ()),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_script_mismatch_is_corrupt() {
    let mut leaf_c = leaf_container();
    let wrong = font(FontRecord {
        script: pptr(0, id(SETTINGS_SCRIPT)),
        name: "Broken SDF",
        material: pptr(0, id(LEAF_MATERIAL)),
        atlas: pptr(0, id(LEAF_ATLAS)),
        characters: &[],
        fallbacks: vec![],
    });
    leaf_c.set_payload(LEAF_BITTER, wrong).unwrap();

    let err = from_containers(leaf_c, dependent_container()).unwrap_err();
    assert!(matches!(err, Error::CorruptContainer(_)), "{err}");
}

#[test]
fn test_missing_dependency_is_corrupt() {
    let dependent_c = Container::new(DEPENDENT_FILE, VERSION);
    let err = from_containers(leaf_container(), dependent_c).unwrap_err();
    assert!(matches!(err, Error::CorruptContainer(_)), "{err}");
}

#[test]
fn test_missing_container_file() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.path(DEPENDENT_FILE)).unwrap();
    let err = Registry::open_default(&fixture.data_dir).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)), "{err}");
}

#[test]
fn test_save_writes_dirty_leaf_only() {
    let fixture = Fixture::new();
    let dependent_before = std::fs::read(fixture.path(DEPENDENT_FILE)).unwrap();

    let mut patcher = fixture.open();
    let atlas = patcher.add_atlas(texture("New Atlas", "")).unwrap();
    assert_eq!(atlas, leaf(SETTINGS + 1));
    assert!(patcher.registry().is_dirty(Side::Leaf));
    assert!(!patcher.registry().is_dirty(Side::Dependent));

    patcher.save().unwrap();
    assert!(!patcher.registry().is_dirty(Side::Leaf));
    assert!(!fixture.path("~resources.assets").exists());
    assert_eq!(std::fs::read(fixture.path(DEPENDENT_FILE)).unwrap(), dependent_before);

    // The reopened session still reads the appended record.
    assert_eq!(patcher.registry().payload(atlas).unwrap(), texture("New Atlas", "").as_slice());
    assert_eq!(patcher.registry().container(Side::Leaf).name(), LEAF_FILE);

    let reopened = fixture.open();
    let registry = reopened.registry();
    assert_eq!(registry.container(Side::Leaf).record_count(), SETTINGS + 2);
    assert_eq!(registry.object_id(atlas).unwrap(), id(SETTINGS + 1));
    assert_eq!(registry.payload(atlas).unwrap(), texture("New Atlas", "").as_slice());
    assert_eq!(registry.fonts().len(), 4);
}

#[test]
fn test_save_remaps_the_written_file() {
    let fixture = Fixture::new();
    let mut patcher = fixture.open();
    patcher.add_atlas(texture("New Atlas", "")).unwrap();
    assert!(patcher.registry().container(Side::Leaf).is_mapped());

    patcher.save().unwrap();
    // Reopened from the new file.
    assert!(patcher.registry().container(Side::Leaf).is_mapped());
    assert!(patcher.registry().container(Side::Dependent).is_mapped());
}

#[cfg(unix)]
#[test]
fn test_failed_rename_keeps_session_readable() {
    let fixture = Fixture::new();
    let mut patcher = fixture.open();
    let atlas = patcher.add_atlas(texture("New Atlas", "")).unwrap();
    let font_before = patcher.registry().payload(leaf(LEAF_BITTER)).unwrap().to_vec();

    // A non-empty directory in place of the file makes the rename fail.
    let target = fixture.path(LEAF_FILE);
    std::fs::remove_file(&target).unwrap();
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep"), b"x").unwrap();

    let err = patcher.save().unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
    assert!(patcher.registry().is_dirty(Side::Leaf));
    assert!(!fixture.path("~resources.assets").exists());

    let registry = patcher.registry();
    assert!(!registry.container(Side::Leaf).is_mapped());
    assert_eq!(registry.payload(leaf(LEAF_BITTER)).unwrap(), font_before.as_slice());
    assert_eq!(registry.payload(atlas).unwrap(), texture("New Atlas", "").as_slice());
    assert_eq!(font_name(registry, leaf(LEAF_BITTER)), "Bitter SDF");
}

#[test]
fn test_save_without_changes() {
    let fixture = Fixture::new();
    let before = std::fs::read(fixture.path(LEAF_FILE)).unwrap();
    let mut patcher = fixture.open();
    patcher.save().unwrap();
    assert_eq!(std::fs::read(fixture.path(LEAF_FILE)).unwrap(), before);
}

#[test]
fn test_custom_session_config() {
    let fixture = Fixture::new();
    let config: SessionConfig = serde_json::from_str(r#"{"fontScript": "TMP_Settings"}"#).unwrap();
    let registry = Registry::open(&fixture.data_dir, config, Box::new(TypeTreeSchemas::default())).unwrap();

    // Only the leaf knows the settings script; its single record becomes the "font".
    let keys: Vec<_> = registry.fonts().keys().copied().collect();
    assert_eq!(keys, vec![leaf(SETTINGS)]);
}
