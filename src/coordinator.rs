//! Bulk Load Coordinator
//!
//! Top-level driver for one bulk load run. Owns the work queue and loops:
//! refresh the partition map, plan placements concurrently, enforce the
//! per-partition-per-family ceiling, fire the atomic load calls concurrently,
//! and requeue whatever failed recoverably or was produced by splitting. The
//! loop assumes the target table may split or move partitions the whole time;
//! the retry budget is the safety net against infinite churn.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

use crate::boundary::infer_boundaries;
use crate::cluster::{ClusterClient, FamilyDescriptor, TableSchema};
use crate::config::Config;
use crate::error::{LoadError, Result};
use crate::load::LoadExecutor;
use crate::plan::PlacementPlanner;
use crate::pool::WorkerPool;
use crate::queue::{populate_queue, WorkItem};
use crate::sstable::SstableReader;
use crate::validate::{check_families, discover_queue, UnmatchedFamilySet};

/// Where the files to load come from
pub enum LoadSource {
    /// A directory with one subdirectory per column family
    Directory(PathBuf),
    /// A pre-grouped `family → files` mapping (skips directory discovery)
    Grouped(HashMap<Bytes, Vec<PathBuf>>),
}

/// Final accounting of a bulk load run.
///
/// Every file that was never committed appears under exactly one reason
/// category, so operators can tell "skipped, safe" from "needs intervention".
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Committed files and the start key of the partition they landed in
    pub committed: HashMap<WorkItem, Bytes>,
    /// Files that disappeared between discovery and placement
    pub missing: Vec<PathBuf>,
    /// Files dropped because their family is not in the schema
    /// (tolerant mode only)
    pub unmatched_family_files: Vec<PathBuf>,
    /// Files skipped because they contain no records
    pub skipped_empty: Vec<PathBuf>,
}

impl LoadReport {
    /// True when nothing was left unplaced for a reason that needs attention
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unmatched_family_files.is_empty()
    }
}

/// Drives a whole bulk load run against one table
pub struct BulkLoadCoordinator<'a> {
    cluster: &'a dyn ClusterClient,
    config: Config,
    pool: WorkerPool,
}

impl<'a> BulkLoadCoordinator<'a> {
    /// Create a coordinator with its own worker pool sized from the config
    pub fn new(cluster: &'a dyn ClusterClient, config: Config) -> Self {
        let pool = WorkerPool::new(config.worker_pool_size);
        Self {
            cluster,
            config,
            pool,
        }
    }

    /// Run the full load: validate and enqueue the source files, then loop
    /// placement and load passes until the queue drains or the retry budget
    /// is exhausted.
    pub fn run(&self, table: &str, source: LoadSource) -> Result<LoadReport> {
        self.ensure_table(table, &source)?;

        let timeout = Duration::from_millis(self.config.table_available_timeout_ms);
        if !self.cluster.wait_available(table, timeout)? {
            return Err(LoadError::TableUnavailable(table.to_string()));
        }

        let schema = self.cluster.table_schema(table)?;

        let mut queue = match source {
            LoadSource::Directory(ref dir) => discover_queue(dir)?,
            LoadSource::Grouped(map) => populate_queue(map),
        };

        let mut report = LoadReport::default();

        let family_check = check_families(
            &mut queue,
            &schema,
            self.config.tolerate_unmatched_families,
        )?;
        let unmatched = family_check.unmatched;
        report.unmatched_family_files = family_check
            .dropped
            .into_iter()
            .map(|item| item.path)
            .collect();

        if queue.is_empty() {
            tracing::warn!("Bulk load operation did not get any files to load");
            return Ok(report);
        }

        self.perform_load(table, &schema, &unmatched, queue, &mut report)?;
        Ok(report)
    }

    // =========================================================================
    // Pass Loop
    // =========================================================================

    fn perform_load(
        &self,
        table: &str,
        schema: &TableSchema,
        unmatched: &UnmatchedFamilySet,
        mut queue: Vec<WorkItem>,
        report: &mut LoadReport,
    ) -> Result<()> {
        // First partition each item was planned into, for drift detection
        let mut planned: HashMap<WorkItem, Bytes> = HashMap::new();
        let mut attempt = 0usize;

        while !queue.is_empty() {
            if self.config.max_retry_passes != 0 && attempt >= self.config.max_retry_passes {
                self.log_abort_report(&queue);
                return Err(LoadError::RetryBudgetExhausted {
                    attempts: attempt,
                    remaining: queue.len(),
                });
            }
            if attempt != 0 {
                tracing::info!(
                    "Partition layout changed while grouping files, retry attempt {} \
                     with {} files remaining to group or split",
                    attempt,
                    queue.len()
                );
            }

            // Fresh snapshot every pass; partitions may have moved.
            let map = self.cluster.partition_map(table)?;

            let planner = PlacementPlanner::new(schema, &self.pool);
            let plan = planner.plan(std::mem::take(&mut queue), &map)?;
            report.missing.extend(plan.missing);
            report.skipped_empty.extend(plan.skipped_empty);

            self.check_file_counts(&plan.groups)?;

            // Record this pass's assignments before dispatching any load.
            let mut assignments: Vec<(WorkItem, Bytes)> = Vec::new();
            for (start, items) in &plan.groups {
                for item in items {
                    if let Some(previous) = planned.get(item) {
                        if previous != start {
                            if self.config.reject_placement_drift {
                                return Err(LoadError::PlacementDrift(item.path.clone()));
                            }
                            tracing::warn!(
                                "File {} re-planned from partition {:?} to {:?}",
                                item.path.display(),
                                previous,
                                start
                            );
                        }
                    }
                    planned.insert(item.clone(), start.clone());
                    assignments.push((item.clone(), start.clone()));
                }
            }

            // Load phase: one atomic call per partition group, in parallel.
            let executor =
                LoadExecutor::new(self.cluster, table, self.config.always_copy_files, unmatched);
            let groups: Vec<(Bytes, Vec<WorkItem>)> = plan.groups.into_iter().collect();
            let results = self
                .pool
                .run(groups, |(start, items)| executor.execute(&start, &items));

            let mut retried: HashSet<WorkItem> = HashSet::new();
            for result in results {
                retried.extend(result?);
            }
            for (item, start) in assignments {
                if !retried.contains(&item) {
                    report.committed.insert(item, start);
                }
            }

            queue = plan.requeued;
            queue.extend(retried);
            attempt += 1;
        }

        tracing::info!(
            "Bulk load finished after {} pass(es): {} committed, {} missing, \
             {} unmatched-family, {} empty",
            attempt,
            report.committed.len(),
            report.missing.len(),
            report.unmatched_family_files.len(),
            report.skipped_empty.len()
        );
        Ok(())
    }

    /// Enforce the per-partition-per-family file-count ceiling for one pass.
    /// Fails fast, before any load call is issued.
    fn check_file_counts(&self, groups: &HashMap<Bytes, Vec<WorkItem>>) -> Result<()> {
        let limit = self.config.max_files_per_partition_per_family;
        for (start, items) in groups {
            let mut per_family: HashMap<&Bytes, usize> = HashMap::new();
            for item in items {
                let count = per_family.entry(&item.family).or_insert(0);
                *count += 1;
                if *count > limit {
                    return Err(LoadError::FileCountExceeded {
                        family: item.family_name(),
                        start_key: format!("{:?}", start),
                        limit,
                    });
                }
            }
        }
        Ok(())
    }

    fn log_abort_report(&self, queue: &[WorkItem]) {
        let mut listing = String::new();
        listing.push_str("-------------------------------------------------\n");
        listing.push_str("Bulk load aborted with some files not yet loaded:\n");
        listing.push_str("-------------------------------------------------\n");
        for item in queue {
            listing.push_str(&format!("  {}\n", item.path.display()));
        }
        tracing::error!("{}", listing);
    }

    // =========================================================================
    // Table Creation
    // =========================================================================

    /// Make sure the target table exists, creating it from the source files
    /// when allowed.
    fn ensure_table(&self, table: &str, source: &LoadSource) -> Result<()> {
        if self.cluster.table_exists(table)? {
            return Ok(());
        }
        match source {
            LoadSource::Directory(dir) if self.config.create_table_if_missing => {
                self.create_table_from_source(table, dir)
            }
            _ => Err(LoadError::TableNotFound(table.to_string())),
        }
    }

    /// Scan the source files once to derive the new table's schema (family
    /// descriptors from the first observed file of each family) and its
    /// split points (inferred from the file key ranges).
    fn create_table_from_source(&self, table: &str, dir: &std::path::Path) -> Result<()> {
        let queue = discover_queue(dir)?;

        let mut families: Vec<FamilyDescriptor> = Vec::new();
        let mut seen: HashSet<Bytes> = HashSet::new();
        let mut ranges: Vec<(Bytes, Bytes)> = Vec::new();

        for item in &queue {
            let reader = SstableReader::open(&item.path)?;
            match reader.key_range() {
                Ok((first, last)) => {
                    tracing::debug!(
                        "Figuring boundaries from file={} first={:?} last={:?}",
                        item.path.display(),
                        first,
                        last
                    );
                    ranges.push((first, last));
                }
                Err(LoadError::EmptyFile(_)) => {}
                Err(e) => return Err(e),
            }
            if seen.insert(item.family.clone()) {
                families.push(FamilyDescriptor::from_observed(
                    item.family.clone(),
                    reader.meta_attrs(),
                ));
            }
        }

        let split_points = infer_boundaries(ranges);
        let schema = TableSchema::new(families);
        self.cluster.create_table(table, &schema, &split_points)?;
        tracing::info!("Table '{}' created with inferred boundaries", table);
        Ok(())
    }
}
