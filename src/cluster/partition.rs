//! Partition Map
//!
//! An ordered snapshot of the target table's partition layout: one
//! `(start_key, end_key)` pair per partition, covering the full key space
//! for a healthy table. The end key of a partition equals the start key of
//! its successor; an empty end key is the open-ended sentinel of the last
//! partition. The snapshot is refreshed from the store at the start of every
//! placement pass and is never owned by this engine.

use bytes::Bytes;

use crate::error::{LoadError, Result};

/// Ordered sequence of partition key ranges
#[derive(Debug, Clone, Default)]
pub struct PartitionMap {
    /// `(start, end)` pairs ordered by start key; empty end = open sentinel
    partitions: Vec<(Bytes, Bytes)>,
}

impl PartitionMap {
    /// Build a map from ordered `(start, end)` pairs
    pub fn new(partitions: Vec<(Bytes, Bytes)>) -> Self {
        Self { partitions }
    }

    /// Build a map from split points: n boundaries produce n + 1 partitions,
    /// the first starting at the empty key and the last ending open.
    pub fn from_split_points(split_points: &[Bytes]) -> Self {
        let mut partitions = Vec::with_capacity(split_points.len() + 1);
        let mut start = Bytes::new();
        for point in split_points {
            partitions.push((start.clone(), point.clone()));
            start = point.clone();
        }
        partitions.push((start, Bytes::new()));
        Self { partitions }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// All `(start, end)` pairs in order
    pub fn ranges(&self) -> &[(Bytes, Bytes)] {
        &self.partitions
    }

    /// Start key of partition `idx`
    pub fn start_key(&self, idx: usize) -> &Bytes {
        &self.partitions[idx].0
    }

    /// End key of partition `idx` (empty = open-ended)
    pub fn end_key(&self, idx: usize) -> &Bytes {
        &self.partitions[idx].1
    }

    /// Locate the partition whose range contains `key`.
    ///
    /// Binary-searches the ordered start keys; a miss is adjusted to the
    /// insertion point minus one. A negative adjusted index means the first
    /// partition's metadata is missing, which is a metadata gap the operator
    /// must repair out of band.
    pub fn locate(&self, key: &[u8]) -> Result<usize> {
        let idx = match self
            .partitions
            .binary_search_by(|(start, _)| start.as_ref().cmp(key))
        {
            Ok(i) => i as isize,
            Err(insertion) => insertion as isize - 1,
        };
        if idx < 0 {
            return Err(LoadError::PartitionMetadata(
                "first partition info not found; repair cluster metadata first".to_string(),
            ));
        }
        Ok(idx as usize)
    }

    /// Verify there is no metadata hole around partition `idx`:
    /// the last partition must end open, and every other partition's end key
    /// must equal its successor's start key.
    pub fn check_contiguous_at(&self, idx: usize) -> Result<()> {
        let last = self.partitions.len() - 1;
        if idx == last {
            if !self.partitions[idx].1.is_empty() {
                return Err(LoadError::PartitionMetadata(
                    "last partition end key is not open-ended; repair cluster metadata first"
                        .to_string(),
                ));
            }
        } else if self.partitions[idx].1 != self.partitions[idx + 1].0 {
            return Err(LoadError::PartitionMetadata(format!(
                "partition end key {:?} does not equal the next partition's start key {:?}; \
                 repair cluster metadata first",
                self.partitions[idx].1, self.partitions[idx + 1].0
            )));
        }
        Ok(())
    }
}
