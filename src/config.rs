//! Configuration for loadstone
//!
//! Centralized configuration with sensible defaults.

/// Main configuration for a bulk load run
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Create the target table (with inferred split points) when it does not
    /// exist yet. Only possible when loading from a source directory.
    pub create_table_if_missing: bool,

    /// Tolerate files whose column family does not exist in the target
    /// schema. When enabled such files are dropped from the queue and listed
    /// in the final report; when disabled they abort the run.
    pub tolerate_unmatched_families: bool,

    /// How long to wait for the target table to become available.
    pub table_available_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Load Configuration
    // -------------------------------------------------------------------------
    /// Ask the target store to physically copy files during the atomic load
    /// instead of moving them out of their source location.
    pub always_copy_files: bool,

    /// Ceiling on the number of files one partition/family pairing may
    /// receive in a single pass. Exceeding it aborts before any load call.
    pub max_files_per_partition_per_family: usize,

    /// Maximum number of placement+load passes before bailing out.
    /// 0 means unlimited.
    pub max_retry_passes: usize,

    /// Reject (instead of warn) when a file ends up committed to a different
    /// partition than the one it was planned into on an earlier pass.
    pub reject_placement_drift: bool,

    // -------------------------------------------------------------------------
    // Concurrency Configuration
    // -------------------------------------------------------------------------
    /// Size of the worker pool used for placement and load tasks.
    pub worker_pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_table_if_missing: true,
            tolerate_unmatched_families: false,
            table_available_timeout_ms: 60_000,
            always_copy_files: false,
            max_files_per_partition_per_family: 32,
            max_retry_passes: 10,
            reject_placement_drift: false,
            worker_pool_size: default_pool_size(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Host parallelism, falling back to 1 when it cannot be determined
fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create the target table when missing (default: true)
    pub fn create_table_if_missing(mut self, enabled: bool) -> Self {
        self.config.create_table_if_missing = enabled;
        self
    }

    /// Tolerate files from unknown column families (default: false)
    pub fn tolerate_unmatched_families(mut self, enabled: bool) -> Self {
        self.config.tolerate_unmatched_families = enabled;
        self
    }

    /// Set the table availability wait timeout (in milliseconds)
    pub fn table_available_timeout_ms(mut self, ms: u64) -> Self {
        self.config.table_available_timeout_ms = ms;
        self
    }

    /// Always physically copy files during the atomic load (default: false)
    pub fn always_copy_files(mut self, enabled: bool) -> Self {
        self.config.always_copy_files = enabled;
        self
    }

    /// Set the per-partition-per-family file count ceiling
    pub fn max_files_per_partition_per_family(mut self, count: usize) -> Self {
        self.config.max_files_per_partition_per_family = count;
        self
    }

    /// Set the retry pass budget (0 = unlimited)
    pub fn max_retry_passes(mut self, count: usize) -> Self {
        self.config.max_retry_passes = count;
        self
    }

    /// Reject placement drift instead of warning (default: false)
    pub fn reject_placement_drift(mut self, enabled: bool) -> Self {
        self.config.reject_placement_drift = enabled;
        self
    }

    /// Set the worker pool size
    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.config.worker_pool_size = size.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
