//! Data File Iterator
//!
//! Sequential iteration over all records of an immutable data file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::Result;

use super::HEADER_SIZE;

/// Iterator over records in sorted key order
pub struct SstableIterator<'a> {
    file: &'a mut BufReader<File>,
    /// Stop reading when we reach this offset (start of meta block)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
}

impl<'a> SstableIterator<'a> {
    /// Create a new iterator starting at the data block
    pub(super) fn new(file: &'a mut BufReader<File>, end_offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: HEADER_SIZE,
        })
    }
}

impl<'a> Iterator for SstableIterator<'a> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        // Stop at meta block
        if self.current_offset >= self.end_offset {
            return None;
        }

        let mut header = [0u8; 8];
        if let Err(e) = self.file.read_exact(&mut header) {
            return Some(Err(e.into()));
        }

        let key_len = u32::from_le_bytes(header[0..4].try_into().unwrap()) as usize;
        let val_len = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;

        let mut key = vec![0u8; key_len];
        if let Err(e) = self.file.read_exact(&mut key) {
            return Some(Err(e.into()));
        }

        let mut value = vec![0u8; val_len];
        if let Err(e) = self.file.read_exact(&mut value) {
            return Some(Err(e.into()));
        }

        self.current_offset += 8 + key_len as u64 + val_len as u64;

        Some(Ok((key, value)))
    }
}
