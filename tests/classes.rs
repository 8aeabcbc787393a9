//! Integration tests for class registries built from files.

use labelprep::classes::{load_class_config, scan_class_frequency, ClassRegistry};
use labelprep::ir::ClassId;

mod common;

#[test]
fn frequency_scan_breaks_ties_by_first_seen() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let xml_dir = temp.path().join("xml");
    // sorted visit order: a.xml, b.xml, sub/c.xml
    common::write_text(
        &xml_dir.join("a.xml"),
        &common::voc_xml("a.jpg", 10, 10, &[("plane", 1, 1, 2, 2), ("car", 1, 1, 2, 2)]),
    );
    common::write_text(
        &xml_dir.join("b.xml"),
        &common::voc_xml("b.jpg", 10, 10, &[("person", 1, 1, 2, 2), ("car", 1, 1, 2, 2)]),
    );
    common::write_text(
        &xml_dir.join("sub").join("c.xml"),
        &common::voc_xml("c.jpg", 10, 10, &[("plane", 1, 1, 2, 2), ("person", 1, 1, 2, 2)]),
    );
    common::write_text(&xml_dir.join("broken.xml"), "<annotation>");

    let scan = scan_class_frequency(&xml_dir).expect("scan");
    assert_eq!(
        scan.counts,
        vec![
            ("plane".to_string(), 2),
            ("car".to_string(), 2),
            ("person".to_string(), 2),
        ]
    );
    assert_eq!(scan.files_scanned, 4);
    assert_eq!(scan.failed_files.len(), 1);

    let registry = ClassRegistry::from_frequency_scan(&xml_dir).expect("registry");
    assert_eq!(registry.resolve("plane"), Some(ClassId(0)));
    assert_eq!(registry.resolve("person"), Some(ClassId(2)));
    assert_eq!(registry.counts().map(|counts| counts.len()), Some(3));
}

#[test]
fn higher_counts_come_first() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let xml_dir = temp.path().join("xml");
    common::write_text(
        &xml_dir.join("a.xml"),
        &common::voc_xml("a.jpg", 10, 10, &[("zebra", 1, 1, 2, 2), ("ant", 1, 1, 2, 2), ("ant", 1, 1, 2, 2)]),
    );

    let registry = ClassRegistry::from_frequency_scan(&xml_dir).expect("registry");
    assert_eq!(registry.names(), ["ant", "zebra"]);
}

#[test]
fn config_file_aliases_resolve_to_canonical_ids() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("classes.yaml");
    common::write_text(
        &path,
        "names: [J-vehicle, M-vehicle, person, plane]\naliases:\n  chariot: J-vehicle\n  car: M-vehicle\n",
    );

    let registry = load_class_config(&path).expect("load");
    assert_eq!(registry.id_count(), 4);
    assert_eq!(registry.resolve("car"), Some(ClassId(1)));
    assert_eq!(registry.resolve("plane"), Some(ClassId(3)));
    assert_eq!(registry.resolve("boat"), None);

    common::write_text(&path, "names: [person]\naliases:\n  car: vehicle\n");
    assert!(load_class_config(&path).is_err());
}
