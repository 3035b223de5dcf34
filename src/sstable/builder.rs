//! Data File Builder
//!
//! Writes sorted key-value records to a new immutable data file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{LoadError, Result};

use super::{SstableMeta, HEADER_SIZE, MAGIC, VERSION};

/// Builder for creating new data files from sorted records
pub struct SstableBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u64,
    /// Current write position (for index)
    current_offset: u64,
    /// Index: key → file offset of entry
    index: Vec<(Vec<u8>, u64)>,
    /// Meta attributes, written between data and index
    meta_attrs: Vec<(String, Vec<u8>)>,
    /// Track first/last keys for metadata
    first_key: Option<Vec<u8>>,
    last_key: Option<Vec<u8>>,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
}

impl SstableBuilder {
    /// Create a new builder
    ///
    /// Writes the header immediately; call `add()` in sorted key order and
    /// `add_meta()` as needed, then `finish()` to write meta, index and footer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);

        // Write header (entry_count placeholder, updated in finish)
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            meta_attrs: Vec::new(),
            first_key: None,
            last_key: None,
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value record (must be called in strictly ascending key order)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(LoadError::malformed(
                    &self.path,
                    format!(
                        "keys out of order: {:?} after {:?}",
                        String::from_utf8_lossy(key),
                        String::from_utf8_lossy(last)
                    ),
                ));
            }
        }

        // Record offset for index and track key range
        self.index.push((key.to_vec(), self.current_offset));
        if self.first_key.is_none() {
            self.first_key = Some(key.to_vec());
        }
        self.last_key = Some(key.to_vec());

        // Entry layout: [key_len(4)][val_len(4)][key][value]
        let key_len_bytes = (key.len() as u32).to_le_bytes();
        let val_len_bytes = (value.len() as u32).to_le_bytes();

        self.writer.write_all(&key_len_bytes)?;
        self.writer.write_all(&val_len_bytes)?;
        self.writer.write_all(key)?;
        self.writer.write_all(value)?;

        self.data_hasher.update(&key_len_bytes);
        self.data_hasher.update(&val_len_bytes);
        self.data_hasher.update(key);
        self.data_hasher.update(value);

        self.current_offset += 8 + key.len() as u64 + value.len() as u64;
        self.entry_count += 1;

        Ok(())
    }

    /// Attach a named meta attribute (file-info), written at finish
    pub fn add_meta(&mut self, name: &str, value: &[u8]) {
        self.meta_attrs.push((name.to_string(), value.to_vec()));
    }

    /// Finish building: write meta block, index block, footer, and return
    /// the file metadata.
    pub fn finish(mut self) -> Result<SstableMeta> {
        // Meta block starts where data ends
        let meta_offset = self.current_offset;

        self.writer
            .write_all(&(self.meta_attrs.len() as u32).to_le_bytes())?;
        let mut meta_size: u64 = 4;
        for (name, value) in &self.meta_attrs {
            self.writer.write_all(&(name.len() as u16).to_le_bytes())?;
            self.writer.write_all(&(value.len() as u32).to_le_bytes())?;
            self.writer.write_all(name.as_bytes())?;
            self.writer.write_all(value)?;
            meta_size += 6 + name.len() as u64 + value.len() as u64;
        }

        // Index block: [key_len(4)][offset(8)][key] per entry
        let index_offset = meta_offset + meta_size;
        for (key, offset) in &self.index {
            self.writer.write_all(&(key.len() as u32).to_le_bytes())?;
            self.writer.write_all(&offset.to_le_bytes())?;
            self.writer.write_all(key)?;
        }

        // Footer: meta_offset (8) + index_offset (8) + data_crc (4) + pad (4)
        let data_crc = self.data_hasher.finalize();
        self.writer.write_all(&meta_offset.to_le_bytes())?;
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;

        self.writer.flush()?;

        // Seek back and patch the entry count in the header
        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| LoadError::Storage(format!("Failed to flush data file: {}", e)))?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();

        Ok(SstableMeta {
            path: self.path,
            entry_count: self.entry_count,
            first_key: Bytes::from(self.first_key.unwrap_or_default()),
            last_key: Bytes::from(self.last_key.unwrap_or_default()),
            file_size,
        })
    }
}
