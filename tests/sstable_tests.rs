//! Tests for the immutable data file format
//!
//! These tests verify:
//! - Builder creation, sorted-order enforcement and entry counting
//! - Reader validation of header, version and footer offsets
//! - Meta attribute round-tripping and lookup
//! - Iterator over all records in key order
//! - Cheap format sniffing during discovery

use std::fs;
use std::path::{Path, PathBuf};

use loadstone::sstable::{is_sstable_format, SstableBuilder, SstableReader};
use loadstone::LoadError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.lds");
    (temp_dir, path)
}

/// Create a data file with numbered entries
fn create_file_with_entries(path: &Path, count: usize) {
    let mut builder = SstableBuilder::new(path).unwrap();
    // Keys must be added in sorted order
    for i in 0..count {
        let key = format!("key{:05}", i); // Zero-padded for lexicographic order
        let value = format!("value{}", i);
        builder.add(key.as_bytes(), value.as_bytes()).unwrap();
    }
    builder.finish().unwrap();
}

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_builder_creates_file() {
    let (_temp, path) = setup_temp_file();

    let mut builder = SstableBuilder::new(&path).unwrap();
    builder.add(b"apple", b"1").unwrap();
    builder.add(b"banana", b"2").unwrap();
    let meta = builder.finish().unwrap();

    assert!(path.exists());
    assert_eq!(meta.entry_count, 2);
    assert_eq!(meta.first_key.as_ref(), b"apple");
    assert_eq!(meta.last_key.as_ref(), b"banana");
    assert!(meta.file_size > 0);
}

#[test]
fn test_builder_empty_file() {
    let (_temp, path) = setup_temp_file();

    let builder = SstableBuilder::new(&path).unwrap();
    let meta = builder.finish().unwrap();

    assert_eq!(meta.entry_count, 0);
    assert!(meta.first_key.is_empty());
    assert!(meta.last_key.is_empty());
    assert!(path.exists());
}

#[test]
fn test_builder_rejects_out_of_order_keys() {
    let (_temp, path) = setup_temp_file();

    let mut builder = SstableBuilder::new(&path).unwrap();
    builder.add(b"banana", b"1").unwrap();
    let result = builder.add(b"apple", b"2");

    assert!(matches!(result, Err(LoadError::MalformedFile { .. })));
}

#[test]
fn test_builder_rejects_duplicate_keys() {
    let (_temp, path) = setup_temp_file();

    let mut builder = SstableBuilder::new(&path).unwrap();
    builder.add(b"apple", b"1").unwrap();
    let result = builder.add(b"apple", b"2");

    assert!(matches!(result, Err(LoadError::MalformedFile { .. })));
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_opens_valid_file() {
    let (_temp, path) = setup_temp_file();
    create_file_with_entries(&path, 10);

    let reader = SstableReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 10);
}

#[test]
fn test_reader_key_range() {
    let (_temp, path) = setup_temp_file();
    create_file_with_entries(&path, 10);

    let reader = SstableReader::open(&path).unwrap();
    let (first, last) = reader.key_range().unwrap();

    assert_eq!(first.as_ref(), b"key00000");
    assert_eq!(last.as_ref(), b"key00009");
}

#[test]
fn test_reader_key_range_of_empty_file() {
    let (_temp, path) = setup_temp_file();
    create_file_with_entries(&path, 0);

    let reader = SstableReader::open(&path).unwrap();

    assert!(reader.first_key().is_none());
    assert!(reader.last_key().is_none());
    assert!(matches!(reader.key_range(), Err(LoadError::EmptyFile(_))));
}

#[test]
fn test_reader_rejects_truncated_file() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, b"LDST").unwrap();

    let result = SstableReader::open(&path);
    assert!(matches!(result, Err(LoadError::MalformedFile { .. })));
}

#[test]
fn test_reader_rejects_bad_magic() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, vec![0u8; 100]).unwrap();

    let result = SstableReader::open(&path);
    assert!(matches!(result, Err(LoadError::MalformedFile { .. })));
}

// =============================================================================
// Meta Attribute Tests
// =============================================================================

#[test]
fn test_meta_attrs_round_trip() {
    let (_temp, path) = setup_temp_file();

    let mut builder = SstableBuilder::new(&path).unwrap();
    builder.add_meta("family.compression", b"lz4");
    builder.add_meta("user.note", b"from offline job");
    builder.add(b"key", b"value").unwrap();
    builder.finish().unwrap();

    let reader = SstableReader::open(&path).unwrap();
    assert_eq!(reader.meta_attrs().len(), 2);
    assert_eq!(reader.meta_attr("family.compression"), Some(b"lz4".as_ref()));
    assert_eq!(
        reader.meta_attr("user.note"),
        Some(b"from offline job".as_ref())
    );
    assert_eq!(reader.meta_attr("absent"), None);
}

#[test]
fn test_meta_attrs_empty_by_default() {
    let (_temp, path) = setup_temp_file();
    create_file_with_entries(&path, 3);

    let reader = SstableReader::open(&path).unwrap();
    assert!(reader.meta_attrs().is_empty());
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_returns_all_records_in_order() {
    let (_temp, path) = setup_temp_file();
    create_file_with_entries(&path, 25);

    let mut reader = SstableReader::open(&path).unwrap();
    let records: Vec<(Vec<u8>, Vec<u8>)> = reader
        .iter()
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(records.len(), 25);
    for window in records.windows(2) {
        assert!(window[0].0 < window[1].0);
    }
    assert_eq!(records[0].0, b"key00000".to_vec());
    assert_eq!(records[0].1, b"value0".to_vec());
}

#[test]
fn test_iterator_over_empty_file() {
    let (_temp, path) = setup_temp_file();
    create_file_with_entries(&path, 0);

    let mut reader = SstableReader::open(&path).unwrap();
    assert_eq!(reader.iter().unwrap().count(), 0);
}

// =============================================================================
// Format Sniff Tests
// =============================================================================

#[test]
fn test_sniff_accepts_data_file() {
    let (_temp, path) = setup_temp_file();
    create_file_with_entries(&path, 1);

    assert!(is_sstable_format(&path).unwrap());
}

#[test]
fn test_sniff_rejects_foreign_file() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, b"not a data file at all").unwrap();

    assert!(!is_sstable_format(&path).unwrap());
}

#[test]
fn test_sniff_rejects_short_file() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, b"LD").unwrap();

    assert!(!is_sstable_format(&path).unwrap());
}
