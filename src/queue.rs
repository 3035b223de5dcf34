//! Load Queue
//!
//! Represents data files waiting to be placed and loaded. A queue is used
//! because the target table may split partitions during the load: when a
//! file no longer fits inside a single partition it is physically split at
//! the partition boundary and both halves are added back to the queue. The
//! run finishes when the queue is empty.

use std::collections::HashMap;
use std::path::PathBuf;

use bytes::Bytes;

/// One immutable data file awaiting placement.
///
/// Immutable once created; a split replaces the item with two children
/// rather than mutating it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    /// Column family the file belongs to (derived from its directory name)
    pub family: Bytes,
    /// Path of the data file
    pub path: PathBuf,
}

impl WorkItem {
    pub fn new(family: impl Into<Bytes>, path: impl Into<PathBuf>) -> Self {
        Self {
            family: family.into(),
            path: path.into(),
        }
    }

    /// Family name for log and report output
    pub fn family_name(&self) -> String {
        String::from_utf8_lossy(&self.family).into_owned()
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "family:{} path:{}", self.family_name(), self.path.display())
    }
}

/// Populate a queue from a pre-grouped `family -> files` mapping.
///
/// Skips directory discovery but the result still goes through family
/// validation and placement like any discovered queue.
pub fn populate_queue(map: HashMap<Bytes, Vec<PathBuf>>) -> Vec<WorkItem> {
    let mut queue = Vec::new();
    for (family, paths) in map {
        for path in paths {
            queue.push(WorkItem::new(family.clone(), path));
        }
    }
    queue
}
