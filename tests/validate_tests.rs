//! Tests for source discovery and schema validation
//!
//! These tests verify:
//! - Directory walking with the documented skip rules
//! - Family name legality
//! - Strict and tolerant handling of unmatched families

use std::fs;
use std::path::Path;

use bytes::Bytes;
use loadstone::cluster::{FamilyDescriptor, TableSchema};
use loadstone::sstable::SstableBuilder;
use loadstone::validate::{check_families, discover_queue, is_legal_family_name};
use loadstone::{LoadError, WorkItem};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn write_data_file(dir: &Path, name: &str, keys: &str) {
    let mut builder = SstableBuilder::new(&dir.join(name)).unwrap();
    for key in keys.chars() {
        let key = key.to_string();
        builder.add(key.as_bytes(), b"v").unwrap();
    }
    builder.finish().unwrap();
}

fn schema_with(families: &[&str]) -> TableSchema {
    TableSchema::new(
        families
            .iter()
            .map(|name| FamilyDescriptor::new(b(name)))
            .collect(),
    )
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[test]
fn test_discover_queues_all_family_files() {
    let temp = TempDir::new().unwrap();
    let cf1 = temp.path().join("cf1");
    let cf2 = temp.path().join("cf2");
    fs::create_dir_all(&cf1).unwrap();
    fs::create_dir_all(&cf2).unwrap();
    write_data_file(&cf1, "f1", "abc");
    write_data_file(&cf1, "f2", "def");
    write_data_file(&cf2, "f3", "xyz");

    let mut queue = discover_queue(temp.path()).unwrap();
    queue.sort_by(|a, b| a.path.cmp(&b.path));

    assert_eq!(queue.len(), 3);
    assert_eq!(queue[0].family, b("cf1"));
    assert_eq!(queue[2].family, b("cf2"));
}

#[test]
fn test_discover_missing_dir_fails() {
    let temp = TempDir::new().unwrap();
    let result = discover_queue(&temp.path().join("absent"));
    assert!(matches!(result, Err(LoadError::Io(_))));
}

#[test]
fn test_discover_skips_underscore_and_foreign_files() {
    let temp = TempDir::new().unwrap();
    let cf1 = temp.path().join("cf1");
    fs::create_dir_all(&cf1).unwrap();
    write_data_file(&cf1, "good", "abc");
    fs::write(cf1.join("_SUCCESS"), b"marker").unwrap();
    fs::write(cf1.join("notes.txt"), b"not a data file").unwrap();

    let queue = discover_queue(temp.path()).unwrap();

    assert_eq!(queue.len(), 1);
    assert!(queue[0].path.ends_with("good"));
}

#[test]
fn test_discover_skips_dot_dirs_and_loose_files() {
    let temp = TempDir::new().unwrap();
    let cf1 = temp.path().join("cf1");
    let tmp = temp.path().join(".tmp");
    fs::create_dir_all(&cf1).unwrap();
    fs::create_dir_all(&tmp).unwrap();
    write_data_file(&cf1, "good", "abc");
    write_data_file(&tmp, "stale-half", "de");
    fs::write(temp.path().join("stray"), b"loose file at family level").unwrap();

    let queue = discover_queue(temp.path()).unwrap();

    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].family, b("cf1"));
}

#[test]
fn test_discover_skips_illegal_family_dirs() {
    let temp = TempDir::new().unwrap();
    let bad = temp.path().join("cf:bad");
    fs::create_dir_all(&bad).unwrap();
    write_data_file(&bad, "f1", "abc");

    let queue = discover_queue(temp.path()).unwrap();
    assert!(queue.is_empty());
}

// =============================================================================
// Family Name Tests
// =============================================================================

#[test]
fn test_legal_family_names() {
    assert!(is_legal_family_name(b"cf1"));
    assert!(is_legal_family_name(b"d"));
    assert!(is_legal_family_name(b"my-family_2"));
}

#[test]
fn test_illegal_family_names() {
    assert!(!is_legal_family_name(b""));
    assert!(!is_legal_family_name(b".hidden"));
    assert!(!is_legal_family_name(b"a:b"));
    assert!(!is_legal_family_name(b"a/b"));
    assert!(!is_legal_family_name(b"a b"));
    assert!(!is_legal_family_name(b"caf\xc3\xa9"));
}

// =============================================================================
// Schema Check Tests
// =============================================================================

#[test]
fn test_check_families_all_matched() {
    let schema = schema_with(&["cf1", "cf2"]);
    let mut queue = vec![
        WorkItem::new(b("cf1"), "/load/cf1/f1"),
        WorkItem::new(b("cf2"), "/load/cf2/f2"),
    ];

    let check = check_families(&mut queue, &schema, false).unwrap();

    assert!(check.unmatched.is_empty());
    assert!(check.dropped.is_empty());
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_check_families_strict_mode_fails() {
    let schema = schema_with(&["cf1"]);
    let mut queue = vec![
        WorkItem::new(b("cf1"), "/load/cf1/f1"),
        WorkItem::new(b("cfX"), "/load/cfX/f2"),
    ];

    let result = check_families(&mut queue, &schema, false);

    match result {
        Err(LoadError::SchemaMismatch { unmatched, valid }) => {
            assert_eq!(unmatched, vec!["cfX".to_string()]);
            assert_eq!(valid, vec!["cf1".to_string()]);
        }
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
}

#[test]
fn test_check_families_tolerant_mode_drops_files() {
    let schema = schema_with(&["cf1"]);
    let mut queue = vec![
        WorkItem::new(b("cf1"), "/load/cf1/f1"),
        WorkItem::new(b("cfX"), "/load/cfX/f2"),
        WorkItem::new(b("cfX"), "/load/cfX/f3"),
    ];

    let check = check_families(&mut queue, &schema, true).unwrap();

    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].family, b("cf1"));
    assert!(check.unmatched.contains(&b("cfX")));
    assert_eq!(check.dropped.len(), 2);
}
