//! Placement Planning
//!
//! One pass of the group-or-split phase: every queued work item is mapped to
//! the partition whose range contains its first key, or physically split at
//! the partition's end key when it straddles a boundary. Items are planned
//! concurrently on the worker pool; the queue itself is drained up front and
//! the per-item results are merged back serially.

use std::collections::HashMap;
use std::path::PathBuf;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::cluster::{PartitionMap, TableSchema};
use crate::error::{LoadError, Result};
use crate::pool::WorkerPool;
use crate::queue::WorkItem;
use crate::split::split_data_file;
use crate::sstable::SstableReader;

/// Per-partition groups built during one planning pass.
///
/// Keyed by partition start key. The only object mutated concurrently by
/// placement tasks; rebuilt from scratch every pass.
#[derive(Default)]
pub struct PlacementGroups {
    inner: Mutex<HashMap<Bytes, Vec<WorkItem>>>,
}

impl PlacementGroups {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, start_key: Bytes, item: WorkItem) {
        self.inner.lock().entry(start_key).or_default().push(item);
    }

    /// Consume the groups after the planning barrier
    pub fn into_groups(self) -> HashMap<Bytes, Vec<WorkItem>> {
        self.inner.into_inner()
    }
}

/// Outcome of planning a single work item
enum PlanOutcome {
    /// Assigned to a partition group
    Grouped,
    /// Straddled a boundary; children to enqueue for the next pass
    Split(Vec<WorkItem>),
    /// The file disappeared between discovery and planning
    Missing(PathBuf),
    /// The file has no records; dropped with a report entry
    SkippedEmpty(PathBuf),
}

/// Merged result of one planning pass
#[derive(Debug, Default)]
pub struct PlanResult {
    /// Work items grouped by target partition start key
    pub groups: HashMap<Bytes, Vec<WorkItem>>,
    /// Split children to be placed on the next pass
    pub requeued: Vec<WorkItem>,
    /// Files that disappeared, recorded for the final report
    pub missing: Vec<PathBuf>,
    /// Empty files dropped, recorded for the final report
    pub skipped_empty: Vec<PathBuf>,
}

/// Maps queued files to partitions, splitting the ones that straddle a
/// boundary
pub struct PlacementPlanner<'a> {
    schema: &'a TableSchema,
    pool: &'a WorkerPool,
}

impl<'a> PlacementPlanner<'a> {
    pub fn new(schema: &'a TableSchema, pool: &'a WorkerPool) -> Self {
        Self { schema, pool }
    }

    /// Plan every item in `queue` against the given partition map snapshot.
    ///
    /// The placement phase fully completes before this returns; a fatal error
    /// from any item (metadata gap, malformed file) aborts the pass after
    /// in-flight items finish.
    pub fn plan(&self, queue: Vec<WorkItem>, map: &PartitionMap) -> Result<PlanResult> {
        let groups = PlacementGroups::new();

        let outcomes = self
            .pool
            .run(queue, |item| self.group_or_split(&groups, item, map));

        let mut result = PlanResult::default();
        for outcome in outcomes {
            match outcome? {
                PlanOutcome::Grouped => {}
                PlanOutcome::Split(children) => result.requeued.extend(children),
                PlanOutcome::Missing(path) => result.missing.push(path),
                PlanOutcome::SkippedEmpty(path) => result.skipped_empty.push(path),
            }
        }
        result.groups = groups.into_groups();
        Ok(result)
    }

    /// Attempt to assign one work item to its target partition group.
    ///
    /// If the file's key range no longer fits inside one partition, splits it
    /// at the partition's end key and returns the two children for requeue.
    fn group_or_split(
        &self,
        groups: &PlacementGroups,
        item: WorkItem,
        map: &PartitionMap,
    ) -> Result<PlanOutcome> {
        let reader = match SstableReader::open(&item.path) {
            Ok(reader) => reader,
            Err(LoadError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("File {} disappeared before placement", item.path.display());
                return Ok(PlanOutcome::Missing(item.path));
            }
            Err(e) => return Err(e),
        };

        let (first, last) = match reader.key_range() {
            Ok(range) => range,
            Err(LoadError::EmptyFile(path)) => {
                tracing::info!("File {} has no entries, skipping", path.display());
                return Ok(PlanOutcome::SkippedEmpty(path));
            }
            Err(e) => return Err(e),
        };
        drop(reader);

        tracing::debug!(
            "Trying to place file={} first={:?} last={:?}",
            item.path.display(),
            first,
            last
        );

        if first > last {
            return Err(LoadError::malformed(
                &item.path,
                format!("invalid key range: {:?} > {:?}", first, last),
            ));
        }

        let idx = map.locate(&first)?;
        map.check_contiguous_at(idx)?;

        let end_key = map.end_key(idx);
        let last_key_in_range = end_key.is_empty() || last.as_ref() < end_key.as_ref();
        if !last_key_in_range {
            let descriptor = self.schema.family(&item.family).ok_or_else(|| {
                LoadError::SchemaMismatch {
                    unmatched: vec![item.family_name()],
                    valid: self.schema.family_names(),
                }
            })?;
            let (bottom, top) = split_data_file(&item, descriptor, end_key)?;
            return Ok(PlanOutcome::Split(vec![bottom, top]));
        }

        groups.insert(map.start_key(idx).clone(), item);
        Ok(PlanOutcome::Grouped)
    }
}
