//! Load Execution
//!
//! Performs one atomic remote load call per partition group. A retryable
//! outcome returns the whole group for re-placement on the next pass, since
//! the partition map may have changed under us. Load calls for different
//! partitions run concurrently on the worker pool; this module handles a
//! single group.

use std::fs;
use std::path::PathBuf;

use bytes::Bytes;

use crate::cluster::{ClusterClient, LoadOutcome};
use crate::error::Result;
use crate::queue::WorkItem;
use crate::validate::UnmatchedFamilySet;

/// Drives the atomic load call for one partition group
pub struct LoadExecutor<'a> {
    cluster: &'a dyn ClusterClient,
    table: &'a str,
    copy_files: bool,
    unmatched: &'a UnmatchedFamilySet,
}

impl<'a> LoadExecutor<'a> {
    pub fn new(
        cluster: &'a dyn ClusterClient,
        table: &'a str,
        copy_files: bool,
        unmatched: &'a UnmatchedFamilySet,
    ) -> Self {
        Self {
            cluster,
            table,
            copy_files,
            unmatched,
        }
    }

    /// Attempt the atomic load of a group of files into the partition
    /// starting at `partition_start`.
    ///
    /// Returns an empty list on success, or the items to retry on a
    /// recoverable failure. Unrecoverable errors propagate and abort the run.
    pub fn execute(&self, partition_start: &Bytes, items: &[WorkItem]) -> Result<Vec<WorkItem>> {
        // Unmatched families were resolved during validation; consult the
        // set rather than re-validating against the schema here.
        let files: Vec<(Bytes, PathBuf)> = items
            .iter()
            .filter(|item| !self.unmatched.contains(&item.family))
            .map(|item| (item.family.clone(), item.path.clone()))
            .collect();
        if files.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Atomic load of {} file(s) into partition starting at {:?}",
            files.len(),
            partition_start
        );

        match self
            .cluster
            .atomic_load(self.table, partition_start, &files, self.copy_files)
        {
            Ok(LoadOutcome::Committed) => Ok(Vec::new()),
            Ok(LoadOutcome::Retry(reason)) => {
                tracing::warn!(
                    "Attempt to load partition containing {:?} failed: {}. \
                     This is recoverable and the group will be retried.",
                    partition_start,
                    reason
                );
                self.restore_staged(&files);
                Ok(items.to_vec())
            }
            Err(e) => {
                tracing::error!(
                    "Unrecoverable error loading partition containing {:?}: {}",
                    partition_start,
                    e
                );
                self.restore_staged(&files);
                Err(e)
            }
        }
    }

    /// Best-effort move of files from the staging/transit location back to
    /// their original paths after a failed attempt. Failures here are soft.
    fn restore_staged(&self, files: &[(Bytes, PathBuf)]) {
        for (family, original) in files {
            let Some(file_name) = original.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(staged) = self.cluster.staging_path(self.table, family, file_name) else {
                continue;
            };
            if !staged.exists() {
                continue;
            }
            match fs::rename(&staged, original) {
                Ok(()) => {
                    tracing::debug!(
                        "Moved back file {} from {}",
                        original.display(),
                        staged.display()
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        "Unable to move back file {} from {}: {}",
                        original.display(),
                        staged.display(),
                        e
                    );
                }
            }
        }
    }
}
