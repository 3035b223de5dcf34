//! File Validation
//!
//! Walks the bulk-load source directory (one subdirectory per column family,
//! each holding immutable sorted data files), filters out everything that is
//! not loadable, and checks the queued families against the target schema.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use bytes::Bytes;

use crate::cluster::TableSchema;
use crate::error::{LoadError, Result};
use crate::queue::WorkItem;
use crate::sstable;
use crate::split::SCRATCH_DIR;

/// Column-family names present in queued files that do not exist in the
/// target schema. Populated once during validation, consulted (not
/// re-validated) during load.
pub type UnmatchedFamilySet = HashSet<Bytes>;

/// Files above this size may lead to oversplitting in the target store;
/// discovery warns but still queues them.
const OVERSPLIT_ADVISORY_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// A family name the target store would accept: non-empty, printable, no
/// path or qualifier separators, and not starting with '.'
pub fn is_legal_family_name(name: &[u8]) -> bool {
    if name.is_empty() || name[0] == b'.' {
        return false;
    }
    name.iter()
        .all(|&b| b > 0x20 && b < 0x7f && b != b':' && b != b'/' && b != b'\\')
}

/// Walk the source directory and queue every loadable data file.
///
/// Layout: `source_dir/<family>/<file>`. Skipped with a warning: non-directory
/// entries at the family level, illegal family names, non-files inside a
/// family, names starting with `_`, files that are not in the expected
/// immutable-sorted format, and files that vanish between listing and
/// format checking. Dot-prefixed directories (the split scratch area among
/// them) are ignored silently.
pub fn discover_queue(source_dir: &Path) -> Result<Vec<WorkItem>> {
    if !source_dir.is_dir() {
        return Err(LoadError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("bulk load dir {} not found", source_dir.display()),
        )));
    }

    let mut queue = Vec::new();
    for family_entry in fs::read_dir(source_dir)? {
        let family_entry = family_entry?;
        let family_path = family_entry.path();
        let family_os_name = family_entry.file_name();
        let family_name = family_os_name.to_string_lossy();

        if family_name.starts_with('.') || family_name == SCRATCH_DIR {
            continue;
        }
        if !family_path.is_dir() {
            tracing::warn!("Skipping non-directory {}", family_path.display());
            continue;
        }
        if !is_legal_family_name(family_name.as_bytes()) {
            tracing::warn!("Skipping invalid family {}", family_path.display());
            continue;
        }

        let family = Bytes::copy_from_slice(family_name.as_bytes());
        for file_entry in fs::read_dir(&family_path)? {
            let file_entry = file_entry?;
            let file_path = file_entry.path();
            let file_name = file_entry.file_name().to_string_lossy().into_owned();

            if !file_path.is_file() {
                tracing::warn!("Skipping non-file {}", file_path.display());
                continue;
            }
            if file_name.starts_with('_') {
                continue;
            }

            match sstable::is_sstable_format(&file_path) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        "File {} does not seem to be a data file, skipping",
                        file_path.display()
                    );
                    continue;
                }
                Err(LoadError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!("File {} was removed, skipping", file_path.display());
                    continue;
                }
                Err(e) => return Err(e),
            }

            let length = file_entry.metadata()?.len();
            if length > OVERSPLIT_ADVISORY_BYTES {
                tracing::warn!(
                    "Bulk loading file {} with size {} bytes can be problematic \
                     as it may lead to oversplitting",
                    file_path.display(),
                    length
                );
            }

            queue.push(WorkItem::new(family.clone(), file_path));
        }
    }

    Ok(queue)
}

/// Result of the family validation step
#[derive(Debug, Default)]
pub struct FamilyCheck {
    /// Families present in the queue but absent from the schema
    pub unmatched: UnmatchedFamilySet,
    /// Files dropped from the queue because their family is unmatched
    /// (only populated in tolerant mode)
    pub dropped: Vec<WorkItem>,
}

/// Check every queued family against the target schema.
///
/// Any unmatched family aborts the run with `SchemaMismatch` unless
/// `tolerate` is set, in which case the affected files are removed from the
/// queue and reported so the committed-item accounting reflects their
/// exclusion.
pub fn check_families(
    queue: &mut Vec<WorkItem>,
    schema: &TableSchema,
    tolerate: bool,
) -> Result<FamilyCheck> {
    let mut check = FamilyCheck::default();
    for item in queue.iter() {
        if schema.family(&item.family).is_none() {
            check.unmatched.insert(item.family.clone());
        }
    }

    if check.unmatched.is_empty() {
        return Ok(check);
    }

    let unmatched_names: Vec<String> = check
        .unmatched
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect();
    tracing::error!(
        "Unmatched family names found in files to be bulk loaded: {:?}; \
         valid family names are: {:?}",
        unmatched_names,
        schema.family_names()
    );

    if !tolerate {
        return Err(LoadError::SchemaMismatch {
            unmatched: unmatched_names,
            valid: schema.family_names(),
        });
    }

    // Tolerant mode: drop unmatched items, keep them for the report
    let mut kept = Vec::with_capacity(queue.len());
    for item in queue.drain(..) {
        if check.unmatched.contains(&item.family) {
            check.dropped.push(item);
        } else {
            kept.push(item);
        }
    }
    *queue = kept;

    Ok(check)
}
