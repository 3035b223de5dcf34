//! Local Cluster
//!
//! A directory-backed, single-process implementation of [`ClusterClient`].
//! Each partition is a directory under the store root and the atomic load
//! call moves (or copies) files into it. Used by the CLI harness and the
//! integration tests; the latter also use its fault-injection hooks to
//! exercise the retry loop the way a reorganizing production store would.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{LoadError, Result};
use crate::sstable::SstableReader;

use super::{ClusterClient, LoadOutcome, PartitionMap, TableSchema};

/// Metadata for one registered table
struct TableState {
    schema: TableSchema,
    /// `(start, end)` pairs ordered by start key
    partitions: Vec<(Bytes, Bytes)>,
}

/// Directory-backed store for local runs and tests
pub struct LocalCluster {
    root: PathBuf,
    tables: Mutex<HashMap<String, TableState>>,
    /// Number of upcoming atomic load calls forced to a Retry outcome
    retry_faults: Mutex<usize>,
    /// Partition split applied when the last injected fault fires, to
    /// simulate a store that reorganized while a load was in flight
    split_after_faults: Mutex<Option<(String, Bytes)>>,
    /// Simulate a staging/transit handoff before the load call
    staging: bool,
}

impl LocalCluster {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            tables: Mutex::new(HashMap::new()),
            retry_faults: Mutex::new(0),
            split_after_faults: Mutex::new(None),
            staging: false,
        })
    }

    /// Enable the staging handoff: files are moved into a transit directory
    /// before each load call and are left there when the call fails.
    pub fn with_staging(mut self) -> Self {
        self.staging = true;
        self
    }

    // =========================================================================
    // Test / Harness Hooks
    // =========================================================================

    /// Force the next `count` atomic load calls to return a Retry outcome
    pub fn inject_retry_faults(&self, count: usize) {
        *self.retry_faults.lock() = count;
    }

    /// Force the next atomic load call to return a Retry outcome and split
    /// the partition covering `key` at `key` in the same breath, the way a
    /// concurrently reorganizing store moves a boundary under a planned load.
    pub fn inject_retry_fault_then_split(&self, table: &str, key: &[u8]) {
        *self.retry_faults.lock() = 1;
        *self.split_after_faults.lock() =
            Some((table.to_string(), Bytes::copy_from_slice(key)));
    }

    /// Split the partition covering `key` at `key`, as a concurrently
    /// reorganizing store would between passes.
    pub fn split_partition(&self, table: &str, key: &[u8]) -> Result<()> {
        let mut tables = self.tables.lock();
        let state = tables
            .get_mut(table)
            .ok_or_else(|| LoadError::TableNotFound(table.to_string()))?;

        let map = PartitionMap::new(state.partitions.clone());
        let idx = map.locate(key)?;
        let (start, end) = state.partitions[idx].clone();
        if start.as_ref() == key {
            return Ok(()); // already a boundary
        }
        let split: Bytes = Bytes::copy_from_slice(key);
        state.partitions[idx] = (start, split.clone());
        state.partitions.insert(idx + 1, (split.clone(), end));
        drop(tables);

        fs::create_dir_all(self.partition_dir(table, &split))?;
        tracing::info!("Split partition of table '{}' at {:?}", table, split);
        Ok(())
    }

    /// Files currently visible in the partition starting at `start`, as
    /// `(family, file_name)` pairs. For assertions and reporting.
    pub fn partition_files(&self, table: &str, start: &[u8]) -> Result<Vec<(String, String)>> {
        let dir = self.partition_dir(table, start);
        let mut files = Vec::new();
        if !dir.exists() {
            return Ok(files);
        }
        for family_entry in fs::read_dir(&dir)? {
            let family_entry = family_entry?;
            if !family_entry.path().is_dir() {
                continue;
            }
            let family = family_entry.file_name().to_string_lossy().into_owned();
            for file_entry in fs::read_dir(family_entry.path())? {
                let file_entry = file_entry?;
                files.push((
                    family.clone(),
                    file_entry.file_name().to_string_lossy().into_owned(),
                ));
            }
        }
        files.sort();
        Ok(files)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn partition_dir(&self, table: &str, start: &[u8]) -> PathBuf {
        let mut name = String::from("part-");
        for byte in start {
            name.push_str(&format!("{:02x}", byte));
        }
        self.root.join(table).join(name)
    }

    fn staging_dir(&self, table: &str, family: &[u8]) -> PathBuf {
        self.root
            .join(table)
            .join(".staging")
            .join(String::from_utf8_lossy(family).into_owned())
    }

    /// Move files into the staging area, as a permission/ownership handoff
    /// would before the real load.
    fn stage_files(&self, table: &str, files: &[(Bytes, PathBuf)]) -> Result<Vec<PathBuf>> {
        let mut staged = Vec::with_capacity(files.len());
        for (family, path) in files {
            let file_name = file_name_of(path)?;
            let dir = self.staging_dir(table, family);
            fs::create_dir_all(&dir)?;
            let dest = dir.join(file_name);
            fs::rename(path, &dest)?;
            staged.push(dest);
        }
        Ok(staged)
    }
}

fn file_name_of(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| LoadError::Cluster(format!("path {} has no file name", path.display())))
}

impl ClusterClient for LocalCluster {
    fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.lock().contains_key(table))
    }

    fn create_table(
        &self,
        table: &str,
        schema: &TableSchema,
        split_points: &[Bytes],
    ) -> Result<()> {
        let map = PartitionMap::from_split_points(split_points);
        for (start, _) in map.ranges() {
            fs::create_dir_all(self.partition_dir(table, start))?;
        }
        let mut tables = self.tables.lock();
        tables.insert(
            table.to_string(),
            TableState {
                schema: schema.clone(),
                partitions: map.ranges().to_vec(),
            },
        );
        tracing::info!(
            "Created table '{}' with {} partition(s)",
            table,
            split_points.len() + 1
        );
        Ok(())
    }

    fn wait_available(&self, table: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.table_exists(table)? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    fn partition_map(&self, table: &str) -> Result<PartitionMap> {
        let tables = self.tables.lock();
        let state = tables
            .get(table)
            .ok_or_else(|| LoadError::TableNotFound(table.to_string()))?;
        Ok(PartitionMap::new(state.partitions.clone()))
    }

    fn table_schema(&self, table: &str) -> Result<TableSchema> {
        let tables = self.tables.lock();
        let state = tables
            .get(table)
            .ok_or_else(|| LoadError::TableNotFound(table.to_string()))?;
        Ok(state.schema.clone())
    }

    fn atomic_load(
        &self,
        table: &str,
        partition_start: &[u8],
        files: &[(Bytes, PathBuf)],
        copy_files: bool,
    ) -> Result<LoadOutcome> {
        // Injected faults fire after the staging handoff, leaving files in
        // transit exactly like a store-side failure would.
        let fault = {
            let mut faults = self.retry_faults.lock();
            if *faults > 0 {
                *faults -= 1;
                true
            } else {
                false
            }
        };
        if fault {
            if self.staging && !copy_files {
                self.stage_files(table, files)?;
            }
            let pending_split = if *self.retry_faults.lock() == 0 {
                self.split_after_faults.lock().take()
            } else {
                None
            };
            if let Some((split_table, key)) = pending_split {
                self.split_partition(&split_table, &key)?;
            }
            return Ok(LoadOutcome::Retry("injected fault".to_string()));
        }

        let (start, end) = {
            let tables = self.tables.lock();
            let state = tables
                .get(table)
                .ok_or_else(|| LoadError::TableNotFound(table.to_string()))?;
            match state
                .partitions
                .iter()
                .find(|(start, _)| start.as_ref() == partition_start)
            {
                Some(range) => range.clone(),
                // The partition this group was planned against no longer
                // exists; the caller must re-place against a fresh map.
                None => {
                    return Ok(LoadOutcome::Retry(
                        "partition no longer exists".to_string(),
                    ))
                }
            }
        };

        // Reject files that no longer fit the (possibly shrunken) partition.
        for (_, path) in files {
            let reader = SstableReader::open(path)?;
            let (first, last) = reader.key_range()?;
            let fits = first.as_ref() >= start.as_ref()
                && (end.is_empty() || last.as_ref() < end.as_ref());
            if !fits {
                return Ok(LoadOutcome::Retry(format!(
                    "file {} does not fit partition range",
                    path.display()
                )));
            }
        }

        // All files validated; make them visible together.
        for (family, path) in files {
            let file_name = file_name_of(path)?.to_owned();
            let dest_dir = self
                .partition_dir(table, partition_start)
                .join(String::from_utf8_lossy(family).into_owned());
            fs::create_dir_all(&dest_dir)?;
            let dest = dest_dir.join(file_name);
            if copy_files {
                fs::copy(path, &dest)?;
            } else {
                fs::rename(path, &dest)?;
            }
        }

        Ok(LoadOutcome::Committed)
    }

    fn staging_path(&self, table: &str, family: &[u8], file_name: &str) -> Option<PathBuf> {
        if !self.staging {
            return None;
        }
        Some(self.staging_dir(table, family).join(file_name))
    }
}
