//! Data File Reader
//!
//! Opens immutable data files and exposes their key range, meta attributes
//! and records via footer/index metadata.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{LoadError, Result};

use super::iterator::SstableIterator;
use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Reader for immutable data files
///
/// Loads the index and meta block into memory on open; record iteration
/// streams from the data block.
pub struct SstableReader {
    /// File handle for reading records
    pub(super) file: BufReader<File>,
    /// Path, kept for error reporting
    path: PathBuf,
    /// In-memory index: key → file offset, in key order
    index: BTreeMap<Vec<u8>, u64>,
    /// Meta attributes in write order
    meta_attrs: Vec<(String, Vec<u8>)>,
    /// Number of entries (from header)
    entry_count: u64,
    /// Data block end (start of meta block, for iteration)
    pub(super) meta_offset: u64,
}

impl SstableReader {
    /// Open a data file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(LoadError::malformed(path, "file too small"));
        }

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(LoadError::malformed(
                path,
                format!("invalid magic, expected LDST, got {:?}", &header[0..4]),
            ));
        }

        let version = u16::from_le_bytes(header[4..6].try_into().unwrap());
        if version != VERSION {
            return Err(LoadError::malformed(
                path,
                format!("unsupported format version {}", version),
            ));
        }

        let entry_count = u64::from_le_bytes(header[6..14].try_into().unwrap());

        // Read footer for meta and index offsets
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let meta_offset = u64::from_le_bytes(footer[0..8].try_into().unwrap());
        let index_offset = u64::from_le_bytes(footer[8..16].try_into().unwrap());
        let _data_crc = u32::from_le_bytes(footer[16..20].try_into().unwrap());

        if meta_offset < HEADER_SIZE
            || index_offset < meta_offset
            || index_offset > file_size - FOOTER_SIZE
        {
            return Err(LoadError::malformed(path, "inconsistent footer offsets"));
        }

        // Load meta block
        file.seek(SeekFrom::Start(meta_offset))?;
        let meta_block_size = (index_offset - meta_offset) as usize;
        let mut meta_data = vec![0u8; meta_block_size];
        file.read_exact(&mut meta_data)?;
        let meta_attrs = parse_meta_block(path, &meta_data)?;

        // Load index block
        let index_block_size = (file_size - FOOTER_SIZE - index_offset) as usize;
        let mut index_data = vec![0u8; index_block_size];
        file.read_exact(&mut index_data)?;
        let index = parse_index_block(path, &index_data)?;

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            file: BufReader::new(file),
            path: path.to_path_buf(),
            index,
            meta_attrs,
            entry_count,
            meta_offset,
        })
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Smallest key, or None for an empty file
    pub fn first_key(&self) -> Option<Bytes> {
        self.index.keys().next().map(|k| Bytes::from(k.clone()))
    }

    /// Largest key, or None for an empty file
    pub fn last_key(&self) -> Option<Bytes> {
        self.index.keys().next_back().map(|k| Bytes::from(k.clone()))
    }

    /// Key range `(first, last)`, or `EmptyFile` when the file has no records
    pub fn key_range(&self) -> Result<(Bytes, Bytes)> {
        match (self.first_key(), self.last_key()) {
            (Some(first), Some(last)) => Ok((first, last)),
            _ => Err(LoadError::EmptyFile(self.path.clone())),
        }
    }

    /// Meta attributes in write order
    pub fn meta_attrs(&self) -> &[(String, Vec<u8>)] {
        &self.meta_attrs
    }

    /// Look up a single meta attribute by name
    pub fn meta_attr(&self, name: &str) -> Option<&[u8]> {
        self.meta_attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Create an iterator over all records in key order
    pub fn iter(&mut self) -> Result<SstableIterator<'_>> {
        SstableIterator::new(&mut self.file, self.meta_offset)
    }
}

/// Parse the meta block: [count u32] then [name_len u16][val_len u32][name][value]
fn parse_meta_block(path: &Path, data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    if data.len() < 4 {
        return Err(LoadError::malformed(path, "truncated meta block"));
    }
    let count = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
    let mut attrs = Vec::with_capacity(count);
    let mut pos = 4;
    for _ in 0..count {
        if pos + 6 > data.len() {
            return Err(LoadError::malformed(path, "truncated meta entry"));
        }
        let name_len = u16::from_le_bytes(data[pos..pos + 2].try_into().unwrap()) as usize;
        let val_len = u32::from_le_bytes(data[pos + 2..pos + 6].try_into().unwrap()) as usize;
        pos += 6;
        if pos + name_len + val_len > data.len() {
            return Err(LoadError::malformed(path, "truncated meta entry"));
        }
        let name = String::from_utf8_lossy(&data[pos..pos + name_len]).into_owned();
        pos += name_len;
        let value = data[pos..pos + val_len].to_vec();
        pos += val_len;
        attrs.push((name, value));
    }
    Ok(attrs)
}

/// Parse the index block: [key_len u32][offset u64][key] per entry
fn parse_index_block(path: &Path, data: &[u8]) -> Result<BTreeMap<Vec<u8>, u64>> {
    let mut index = BTreeMap::new();
    let mut pos = 0;
    while pos < data.len() {
        if pos + 12 > data.len() {
            return Err(LoadError::malformed(path, "truncated index entry"));
        }
        let key_len = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
        let offset = u64::from_le_bytes(data[pos + 4..pos + 12].try_into().unwrap());
        pos += 12;
        if pos + key_len > data.len() {
            return Err(LoadError::malformed(path, "truncated index entry"));
        }
        index.insert(data[pos..pos + key_len].to_vec(), offset);
        pos += key_len;
    }
    Ok(index)
}
