//! Enrollment catalog tests: round trip, completion-marker idempotence, and
//! corruption detection.

use std::fs;

use tempfile::TempDir;

use iris_1n::store::{catalog_path, is_complete, read_catalog, write_catalog};
use iris_1n::{CatalogError, DatabaseEntry};

fn entries() -> Vec<DatabaseEntry> {
    vec![
        DatabaseEntry::new("zulu", vec![0x10, 0x20, 0x30]),
        DatabaseEntry::new("alpha", vec![]),
        DatabaseEntry::new("mike", vec![0xFF]),
    ]
}

#[test]
fn round_trip_preserves_insertion_order() {
    let store = TempDir::new().unwrap();
    assert!(!is_complete(store.path()));

    assert!(write_catalog(store.path(), &entries()).unwrap());
    assert!(is_complete(store.path()));

    let loaded = read_catalog(store.path()).unwrap();
    assert_eq!(loaded, entries());
}

#[test]
fn second_write_is_a_noop_that_keeps_the_first_catalog() {
    let store = TempDir::new().unwrap();
    assert!(write_catalog(store.path(), &entries()).unwrap());
    let first = fs::read_to_string(catalog_path(store.path())).unwrap();

    // A later construction, even with a different record set, must not
    // disturb the completed store.
    let other = vec![DatabaseEntry::new("other", vec![0x01])];
    assert!(!write_catalog(store.path(), &other).unwrap());

    let second = fs::read_to_string(catalog_path(store.path())).unwrap();
    assert_eq!(first, second);
    assert_eq!(read_catalog(store.path()).unwrap(), entries());
}

#[test]
fn missing_store_directory_is_reported() {
    let store = TempDir::new().unwrap();
    let missing = store.path().join("nope");
    assert!(matches!(
        write_catalog(&missing, &entries()),
        Err(CatalogError::MissingStore { .. })
    ));
}

#[test]
fn reading_an_absent_catalog_fails_with_io() {
    let store = TempDir::new().unwrap();
    assert!(matches!(read_catalog(store.path()), Err(CatalogError::Io { .. })));
}

#[test]
fn tampered_record_bytes_fail_the_checksum() {
    let store = TempDir::new().unwrap();
    let records = vec![DatabaseEntry::new("a", vec![0x00])];
    assert!(write_catalog(store.path(), &records).unwrap());

    let path = catalog_path(store.path());
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("sig = 00", "sig = 01")).unwrap();

    assert!(matches!(read_catalog(store.path()), Err(CatalogError::ChecksumMismatch)));
}

#[test]
fn tampered_count_is_reported() {
    let store = TempDir::new().unwrap();
    assert!(write_catalog(store.path(), &entries()).unwrap());

    let path = catalog_path(store.path());
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("count = 3", "count = 2")).unwrap();

    assert!(matches!(
        read_catalog(store.path()),
        Err(CatalogError::CountMismatch { declared: 2, actual: 3 })
    ));
}

#[test]
fn unsupported_version_is_reported() {
    let store = TempDir::new().unwrap();
    assert!(write_catalog(store.path(), &entries()).unwrap());

    let path = catalog_path(store.path());
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("version = 1", "version = 9")).unwrap();

    assert!(matches!(
        read_catalog(store.path()),
        Err(CatalogError::UnsupportedVersion { version: 9 })
    ));
}

#[test]
fn duplicate_identifiers_are_rejected_at_load() {
    let store = TempDir::new().unwrap();
    let twins = vec![
        DatabaseEntry::new("twin", vec![0x01]),
        DatabaseEntry::new("twin", vec![0x02]),
    ];
    // The writer trusts its caller; the loader does not.
    assert!(write_catalog(store.path(), &twins).unwrap());

    assert!(matches!(
        read_catalog(store.path()),
        Err(CatalogError::DuplicateId { .. })
    ));
}

#[test]
fn garbage_lines_are_rejected() {
    let store = TempDir::new().unwrap();
    assert!(write_catalog(store.path(), &entries()).unwrap());

    let path = catalog_path(store.path());
    let mut text = fs::read_to_string(&path).unwrap();
    text.push_str("not a keyword line\n");
    fs::write(&path, text).unwrap();

    assert!(matches!(read_catalog(store.path()), Err(CatalogError::Parse { .. })));
}
