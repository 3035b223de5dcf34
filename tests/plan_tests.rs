//! Tests for placement planning
//!
//! These tests verify:
//! - Grouping of files under the partition containing their first key
//! - Boundary-straddling files split and requeued instead of grouped
//! - Vanished and empty files recorded without failing the pass
//! - Metadata holes abort the pass

use std::path::Path;

use bytes::Bytes;
use loadstone::cluster::{FamilyDescriptor, PartitionMap, TableSchema};
use loadstone::plan::PlacementPlanner;
use loadstone::pool::WorkerPool;
use loadstone::sstable::SstableBuilder;
use loadstone::{LoadError, WorkItem};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn write_data_file(dir: &Path, name: &str, keys: &str) -> WorkItem {
    let path = dir.join(name);
    let mut builder = SstableBuilder::new(&path).unwrap();
    for key in keys.chars() {
        let key = key.to_string();
        builder.add(key.as_bytes(), b"v").unwrap();
    }
    builder.finish().unwrap();
    WorkItem::new(b("cf1"), path)
}

fn cf1_schema() -> TableSchema {
    TableSchema::new(vec![FamilyDescriptor::new(b("cf1"))])
}

/// Two partitions split at "m"
fn two_partition_map() -> PartitionMap {
    PartitionMap::from_split_points(&[b("m")])
}

// =============================================================================
// Grouping Tests
// =============================================================================

#[test]
fn test_plan_groups_fitting_files() {
    let temp = TempDir::new().unwrap();
    let low = write_data_file(temp.path(), "low", "abc");
    let high = write_data_file(temp.path(), "high", "npz");

    let schema = cf1_schema();
    let pool = WorkerPool::new(2);
    let planner = PlacementPlanner::new(&schema, &pool);
    let plan = planner
        .plan(vec![low.clone(), high.clone()], &two_partition_map())
        .unwrap();

    assert_eq!(plan.groups.len(), 2);
    assert_eq!(plan.groups[&Bytes::new()], vec![low]);
    assert_eq!(plan.groups[&b("m")], vec![high]);
    assert!(plan.requeued.is_empty());
    assert!(plan.missing.is_empty());
}

#[test]
fn test_plan_file_ending_at_boundary_fits() {
    let temp = TempDir::new().unwrap();
    // Last key "l" is below the exclusive end "m"
    let item = write_data_file(temp.path(), "edge", "al");

    let schema = cf1_schema();
    let pool = WorkerPool::new(1);
    let planner = PlacementPlanner::new(&schema, &pool);
    let plan = planner.plan(vec![item], &two_partition_map()).unwrap();

    assert_eq!(plan.groups.len(), 1);
    assert!(plan.requeued.is_empty());
}

#[test]
fn test_replanning_against_unchanged_map_is_stable() {
    let temp = TempDir::new().unwrap();
    let item = write_data_file(temp.path(), "f1", "npq");

    let schema = cf1_schema();
    let pool = WorkerPool::new(2);
    let planner = PlacementPlanner::new(&schema, &pool);
    let map = two_partition_map();

    let first = planner.plan(vec![item.clone()], &map).unwrap();
    let second = planner.plan(vec![item.clone()], &map).unwrap();

    assert_eq!(first.groups[&b("m")], vec![item.clone()]);
    assert_eq!(second.groups[&b("m")], vec![item]);
}

// =============================================================================
// Splitting Tests
// =============================================================================

#[test]
fn test_plan_splits_straddling_file() {
    let temp = TempDir::new().unwrap();
    let item = write_data_file(temp.path(), "wide", "gkpr");

    let schema = cf1_schema();
    let pool = WorkerPool::new(1);
    let planner = PlacementPlanner::new(&schema, &pool);
    let plan = planner.plan(vec![item], &two_partition_map()).unwrap();

    // Nothing grouped this pass; both halves wait for the next one
    assert!(plan.groups.is_empty());
    assert_eq!(plan.requeued.len(), 2);
    for child in &plan.requeued {
        assert!(child.path.exists());
    }
}

#[test]
fn test_plan_split_file_with_last_key_equal_to_end() {
    let temp = TempDir::new().unwrap();
    // Last key "m" equals the partition end key, so the file does not fit
    let item = write_data_file(temp.path(), "edge", "am");

    let schema = cf1_schema();
    let pool = WorkerPool::new(1);
    let planner = PlacementPlanner::new(&schema, &pool);
    let plan = planner.plan(vec![item], &two_partition_map()).unwrap();

    assert!(plan.groups.is_empty());
    assert_eq!(plan.requeued.len(), 2);
}

// =============================================================================
// Skip Tests
// =============================================================================

#[test]
fn test_plan_records_vanished_file() {
    let temp = TempDir::new().unwrap();
    let item = WorkItem::new(b("cf1"), temp.path().join("vanished"));

    let schema = cf1_schema();
    let pool = WorkerPool::new(1);
    let planner = PlacementPlanner::new(&schema, &pool);
    let plan = planner.plan(vec![item], &two_partition_map()).unwrap();

    assert!(plan.groups.is_empty());
    assert_eq!(plan.missing.len(), 1);
}

#[test]
fn test_plan_skips_empty_file() {
    let temp = TempDir::new().unwrap();
    let item = write_data_file(temp.path(), "empty", "");

    let schema = cf1_schema();
    let pool = WorkerPool::new(1);
    let planner = PlacementPlanner::new(&schema, &pool);
    let plan = planner.plan(vec![item], &two_partition_map()).unwrap();

    assert!(plan.groups.is_empty());
    assert_eq!(plan.skipped_empty.len(), 1);
}

// =============================================================================
// Metadata Hole Tests
// =============================================================================

#[test]
fn test_plan_fails_on_partition_gap() {
    let temp = TempDir::new().unwrap();
    let item = write_data_file(temp.path(), "f1", "abc");

    // ["", f) is followed by [g, open): contiguity check must fail
    let map = PartitionMap::new(vec![(Bytes::new(), b("f")), (b("g"), Bytes::new())]);

    let schema = cf1_schema();
    let pool = WorkerPool::new(1);
    let planner = PlacementPlanner::new(&schema, &pool);
    let result = planner.plan(vec![item], &map);

    assert!(matches!(result, Err(LoadError::PartitionMetadata(_))));
}
