//! Immutable Sorted Data File Module
//!
//! The on-disk format for bulk-load input files: an append-once, range-indexed
//! file holding key-ordered records, read via footer/index metadata. Files are
//! produced by an offline pipeline (or by the splitter) and are never mutated.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "LDST" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry, strictly sorted ...      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Meta Block (variable)                                   │
//! │   AttrCount: u32                                        │
//! │   [NameLen: u16][ValLen: u32][Name][Value] ...          │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                  │
//! │   [KeyLen: u32][Offset: u64][Key] ...                   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (24 bytes)                                       │
//! │   MetaOffset: u64 | IndexOffset: u64                    │
//! │   DataCRC: u32 | Padding (4)                            │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod iterator;
mod reader;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::Bytes;

pub use builder::SstableBuilder;
pub use iterator::SstableIterator;
pub use reader::SstableReader;

use crate::error::Result;

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic bytes identifying a loadstone data file
pub(crate) const MAGIC: &[u8; 4] = b"LDST";

/// Current format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: MetaOffset (8) + IndexOffset (8) + DataCRC (4) + Padding (4)
pub(crate) const FOOTER_SIZE: u64 = 24;

/// Meta attribute names with this prefix describe physical block structure
/// (e.g. the data block encoding marker). They must never be copied into a
/// split half, since the half is re-encoded by its own builder.
pub const STRUCTURAL_META_PREFIX: &str = "blk.";

/// Returns true for meta attributes that may be carried over when a file is
/// rewritten (split halves copy everything except structural keys).
pub fn should_copy_meta_key(name: &str) -> bool {
    !name.starts_with(STRUCTURAL_META_PREFIX)
}

/// Cheap format sniff: reads only the magic bytes.
///
/// Used during discovery to skip foreign files without paying for a full
/// footer/index load.
pub fn is_sstable_format(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == MAGIC),
        Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// File Metadata
// =============================================================================

/// Metadata describing a closed data file
#[derive(Debug, Clone)]
pub struct SstableMeta {
    /// Path to the file
    pub path: PathBuf,
    /// Number of entries
    pub entry_count: u64,
    /// Smallest key, empty for an empty file
    pub first_key: Bytes,
    /// Largest key, empty for an empty file
    pub last_key: Bytes,
    /// File size in bytes
    pub file_size: u64,
}
