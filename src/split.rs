//! File Splitting
//!
//! Physically splits one immutable data file into two halves at a partition
//! boundary key: a "bottom" file with keys below the boundary and a "top"
//! file with the rest. Halves land in a scratch directory next to the source
//! and are queued as brand-new work items; the source itself is deleted only
//! when it is a prior split product living in that scratch area.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cluster::FamilyDescriptor;
use crate::error::Result;
use crate::queue::WorkItem;
use crate::sstable::{should_copy_meta_key, SstableBuilder, SstableReader};

/// Scratch directory for split halves, created next to the source file.
/// The '.' prefix keeps it out of directory discovery; it is not a valid
/// family name.
pub const SCRATCH_DIR: &str = ".tmp";

/// Meta attribute naming the file a half was split from
pub const META_SPLIT_SOURCE: &str = "split.source";
/// Meta attribute carrying the boundary key a half was split at
pub const META_SPLIT_BOUNDARY: &str = "split.boundary";

static SPLIT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique base name for a pair of split halves
fn unique_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = SPLIT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{:x}{:06x}", nanos, seq)
}

/// Split `item`'s file at `split_key` into bottom (`keys < split_key`) and
/// top (`keys >= split_key`) halves.
///
/// Family-level metadata (compression, block size, bloom kind) is taken from
/// the target schema's descriptor, not from the source file; remaining source
/// meta attributes are carried over except structural `blk.*` keys, which
/// would corrupt decoding of the re-encoded halves.
pub fn split_data_file(
    item: &WorkItem,
    descriptor: &FamilyDescriptor,
    split_key: &[u8],
) -> Result<(WorkItem, WorkItem)> {
    let source_path = &item.path;
    let parent = source_path.parent().unwrap_or_else(|| Path::new("."));
    let source_is_scratch = parent
        .file_name()
        .map(|n| n == SCRATCH_DIR)
        .unwrap_or(false);
    let scratch = if source_is_scratch {
        parent.to_path_buf()
    } else {
        parent.join(SCRATCH_DIR)
    };
    fs::create_dir_all(&scratch)?;

    tracing::info!(
        "Data file at {} no longer fits inside a single partition. Splitting...",
        source_path.display()
    );

    let base = unique_name();
    let bottom_out = scratch.join(format!("{}.bottom", base));
    let top_out = scratch.join(format!("{}.top", base));

    let mut reader = SstableReader::open(source_path)?;

    let mut bottom = SstableBuilder::new(&bottom_out)?;
    let mut top = SstableBuilder::new(&top_out)?;

    // Family-level metadata comes from the schema descriptor
    let mut written: HashSet<String> = HashSet::new();
    for builder in [&mut bottom, &mut top] {
        builder.add_meta(
            "family.compression",
            descriptor.compression.as_str().as_bytes(),
        );
        builder.add_meta("family.blocksize", descriptor.block_size.to_string().as_bytes());
        builder.add_meta("family.bloom", descriptor.bloom.as_str().as_bytes());
        builder.add_meta(META_SPLIT_SOURCE, source_path.to_string_lossy().as_bytes());
        builder.add_meta(META_SPLIT_BOUNDARY, split_key);
    }
    written.insert("family.compression".to_string());
    written.insert("family.blocksize".to_string());
    written.insert("family.bloom".to_string());
    written.insert(META_SPLIT_SOURCE.to_string());
    written.insert(META_SPLIT_BOUNDARY.to_string());

    // Carry over the source's remaining attributes, minus structural keys
    let source_attrs: Vec<(String, Vec<u8>)> = reader.meta_attrs().to_vec();
    for (name, value) in &source_attrs {
        if should_copy_meta_key(name) && !written.contains(name) {
            bottom.add_meta(name, value);
            top.add_meta(name, value);
        }
    }

    // Single pass over the records, routed by the boundary
    for record in reader.iter()? {
        let (key, value) = record?;
        if key.as_slice() < split_key {
            bottom.add(&key, &value)?;
        } else {
            top.add(&key, &value)?;
        }
    }

    bottom.finish()?;
    top.finish()?;

    // A source that is itself a split product is not part of the original
    // input; remove it to save scratch space. Failure is soft.
    if source_is_scratch {
        if let Err(e) = fs::remove_file(source_path) {
            tracing::warn!(
                "Unable to delete temporary split file {}: {}",
                source_path.display(),
                e
            );
        }
    }

    tracing::info!(
        "Successfully split into new data files {} and {}",
        bottom_out.display(),
        top_out.display()
    );

    Ok((
        WorkItem::new(item.family.clone(), bottom_out),
        WorkItem::new(item.family.clone(), top_out),
    ))
}
