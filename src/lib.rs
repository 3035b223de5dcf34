//! # loadstone
//!
//! A bulk-load admission and placement engine for live, range-partitioned
//! key-value stores. Pre-sorted immutable data files produced by an offline
//! pipeline are validated, mapped onto the target table's partitions, split
//! at partition boundaries when needed, and made visible through atomic
//! per-partition load calls, all while the target keeps serving traffic and
//! reorganizing its partitions.
//!
//! ## Architecture Overview
//!
//! ```text
//! discovered files
//!        │
//!        ▼
//! ┌─────────────┐     ┌──────────────────────────────────────┐
//! │  Validator  │────▶│             Work Queue               │◀─┐
//! └─────────────┘     └──────────────────┬───────────────────┘  │
//!                                        │ drain (per pass)     │
//!                     ┌──────────────────▼───────────────────┐  │
//!                     │   PlacementPlanner (worker pool)     │  │ split
//!                     │   group by partition ── or split ────┼──┘ children
//!                     └──────────────────┬───────────────────┘  │
//!                                        │ per-partition groups │
//!                     ┌──────────────────▼───────────────────┐  │
//!                     │     LoadExecutor (worker pool)       │  │ retryable
//!                     │     one atomic load per partition ───┼──┘ failures
//!                     └──────────────────┬───────────────────┘
//!                                        │
//!                                        ▼
//!                               committed / report
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod boundary;
pub mod cluster;
pub mod coordinator;
pub mod load;
pub mod plan;
pub mod pool;
pub mod queue;
pub mod split;
pub mod sstable;
pub mod validate;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use coordinator::{BulkLoadCoordinator, LoadReport, LoadSource};
pub use error::{LoadError, Result};
pub use queue::WorkItem;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of loadstone
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
