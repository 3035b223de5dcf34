//! Cluster Module
//!
//! The boundary to the target store: schema and partition metadata lookups,
//! table creation, and the per-partition atomic load call. Everything the
//! engine needs from the store goes through the [`ClusterClient`] trait so
//! that the real RPC plumbing stays outside this crate; [`LocalCluster`] is
//! the in-tree, directory-backed implementation used by the CLI harness and
//! the integration tests.

mod local;
mod partition;

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

pub use local::LocalCluster;
pub use partition::PartitionMap;

use crate::error::Result;

// =============================================================================
// Schema Types
// =============================================================================

/// Compression algorithm applied to a family's data blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Compression::None),
            "lz4" => Some(Compression::Lz4),
            "zstd" => Some(Compression::Zstd),
            _ => None,
        }
    }
}

/// Bloom filter kind configured for a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BloomKind {
    None,
    #[default]
    Row,
    RowCol,
}

impl BloomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BloomKind::None => "none",
            BloomKind::Row => "row",
            BloomKind::RowCol => "rowcol",
        }
    }
}

/// Per-family storage descriptor in the target schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDescriptor {
    /// Family name
    pub name: Bytes,
    /// Data block compression
    pub compression: Compression,
    /// Data block size in bytes
    pub block_size: u32,
    /// Bloom filter kind
    pub bloom: BloomKind,
}

/// Meta attribute carrying the compression a file was written with
pub const META_COMPRESSION: &str = "family.compression";

impl FamilyDescriptor {
    /// Descriptor with defaults for the given family name
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            compression: Compression::default(),
            block_size: 64 * 1024,
            bloom: BloomKind::default(),
        }
    }

    /// Derive a descriptor from the first observed file of a family.
    ///
    /// Pure function used once during table creation: the compression seen in
    /// the file's meta attributes overrides the default so the new table's
    /// family matches the data it is about to receive.
    pub fn from_observed(name: Bytes, meta_attrs: &[(String, Vec<u8>)]) -> Self {
        let mut descriptor = Self::new(name);
        if let Some((_, value)) = meta_attrs.iter().find(|(n, _)| n == META_COMPRESSION) {
            if let Some(compression) = Compression::parse(&String::from_utf8_lossy(value)) {
                descriptor.compression = compression;
            }
        }
        descriptor
    }
}

/// Schema of the target table: the set of column families
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub families: Vec<FamilyDescriptor>,
}

impl TableSchema {
    pub fn new(families: Vec<FamilyDescriptor>) -> Self {
        Self { families }
    }

    /// Look up a family descriptor by name
    pub fn family(&self, name: &[u8]) -> Option<&FamilyDescriptor> {
        self.families.iter().find(|f| f.name.as_ref() == name)
    }

    /// Family names as strings, for error messages
    pub fn family_names(&self) -> Vec<String> {
        self.families
            .iter()
            .map(|f| String::from_utf8_lossy(&f.name).into_owned())
            .collect()
    }
}

// =============================================================================
// Load Call Types
// =============================================================================

/// Outcome of one per-partition atomic load call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// All listed files became visible in the partition
    Committed,
    /// Recoverable failure (partition moved/split, transient unavailability);
    /// the whole group must be re-placed on the next pass
    Retry(String),
}

// =============================================================================
// Client Trait
// =============================================================================

/// Operations the target store must expose to the bulk-load engine.
///
/// Implementations are called from worker-pool threads; all methods are
/// ordinary blocking calls.
pub trait ClusterClient: Send + Sync {
    /// Check whether the table exists
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Create the table with the given split points (one boundary key per
    /// partition border; n split points produce n + 1 partitions)
    fn create_table(
        &self,
        table: &str,
        schema: &TableSchema,
        split_points: &[Bytes],
    ) -> Result<()>;

    /// Wait until the table is available, polling up to `timeout`
    fn wait_available(&self, table: &str, timeout: Duration) -> Result<bool>;

    /// Snapshot of the current partition layout
    fn partition_map(&self, table: &str) -> Result<PartitionMap>;

    /// Current table schema
    fn table_schema(&self, table: &str) -> Result<TableSchema>;

    /// One atomic load of many files into the partition starting at
    /// `partition_start`. All-or-nothing: either every listed file becomes
    /// visible in that partition, or none does.
    fn atomic_load(
        &self,
        table: &str,
        partition_start: &[u8],
        files: &[(Bytes, PathBuf)],
        copy_files: bool,
    ) -> Result<LoadOutcome>;

    /// Staging (transit) location a file was moved to before the load call,
    /// if the store uses one. Used for best-effort restore after a failed
    /// load attempt.
    fn staging_path(&self, _table: &str, _family: &[u8], _file_name: &str) -> Option<PathBuf> {
        None
    }
}
