//! Append-only commit journal
//!
//! Record layout (little-endian):
//!
//! ```text
//! | length: u32 | payload: [u8; length] | crc32: u32 |
//! ```
//!
//! The payload is a JSON-encoded `JournalRecord`. The checksum covers the
//! length bytes and the payload. Reading is strict: a truncated record or a
//! checksum mismatch anywhere in the file is corruption, never skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};
use super::types::{TableDefinition, Value};

const LENGTH_SIZE: u64 = 4;
const CHECKSUM_SIZE: u64 = 4;

/// One replayable engine statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalOp {
    CreateTable { definition: TableDefinition },
    Insert { table: String, values: Vec<(String, Value)> },
    Delete { table: String, matches: Vec<(String, Value)> },
}

impl JournalOp {
    pub(crate) fn insert(table: &str, values: &[(&str, Value)]) -> Self {
        JournalOp::Insert {
            table: table.to_string(),
            values: owned_pairs(values),
        }
    }

    pub(crate) fn delete(table: &str, matches: &[(&str, Value)]) -> Self {
        JournalOp::Delete {
            table: table.to_string(),
            matches: owned_pairs(matches),
        }
    }
}

fn owned_pairs(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
    pairs
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect()
}

/// One committed unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    pub ops: Vec<JournalOp>,
}

fn checksum(length: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(length);
    hasher.update(payload);
    hasher.finalize()
}

/// Appends records and fsyncs each one before returning.
///
/// A failed append is cut back to the last complete record. If that fails
/// too the writer is poisoned and every later append is refused.
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    offset: u64,
    poisoned: bool,
    #[cfg(test)]
    fail_after: Option<usize>,
}

impl JournalWriter {
    /// Opens the journal for append, creating it and its parent directories
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    EngineError::io(format!("failed to create journal directory {}", parent.display()), e)
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EngineError::io(format!("failed to open journal {}", path.display()), e))?;

        let offset = file
            .metadata()
            .map_err(|e| EngineError::io("failed to read journal metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            poisoned: false,
            #[cfg(test)]
            fail_after: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the journal
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Appends one record and syncs it to disk; returns bytes written
    pub fn append(&mut self, record: &JournalRecord) -> EngineResult<u64> {
        if self.poisoned {
            return Err(EngineError::JournalPoisoned { offset: self.offset });
        }
        let payload = serde_json::to_vec(record).map_err(|e| EngineError::Encoding(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| EngineError::Encoding(format!("record of {} bytes is too large", payload.len())))?
            .to_le_bytes();

        let mut frame = Vec::with_capacity(payload.len() + 8);
        frame.extend_from_slice(&length);
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&checksum(&length, &payload).to_le_bytes());

        if let Err(e) = self.write_frame(&frame) {
            let error = EngineError::io(format!("failed to append journal record {}", record.sequence), e);
            return Err(self.cut_back(error));
        }

        self.offset += frame.len() as u64;
        Ok(frame.len() as u64)
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if let Some(failure) = self.injected_failure(frame) {
            return failure;
        }
        self.file.write_all(frame)?;
        self.file.sync_data()
    }

    #[cfg(not(test))]
    fn injected_failure(&mut self, _frame: &[u8]) -> Option<io::Result<()>> {
        None
    }

    #[cfg(test)]
    fn injected_failure(&mut self, frame: &[u8]) -> Option<io::Result<()>> {
        let budget = self.fail_after.take()?;
        Some(
            self.file
                .write_all(&frame[..budget.min(frame.len())])
                .and_then(|_| Err(io::Error::new(io::ErrorKind::Other, "injected write failure"))),
        )
    }

    /// Drops any bytes written past the last complete record
    fn cut_back(&mut self, error: EngineError) -> EngineError {
        match self.file.set_len(self.offset).and_then(|_| self.file.sync_data()) {
            Ok(()) => error,
            Err(_) => {
                self.poisoned = true;
                EngineError::JournalPoisoned { offset: self.offset }
            }
        }
    }

    /// Makes the next append write `bytes` of its frame and then fail
    #[cfg(test)]
    pub(crate) fn fail_next_append_after(&mut self, bytes: usize) {
        self.fail_after = Some(bytes);
    }
}

/// Sequential, checksum-verifying journal reader
pub struct JournalReader {
    reader: BufReader<File>,
    offset: u64,
    file_size: u64,
}

impl JournalReader {
    pub fn open(path: &Path) -> EngineResult<Self> {
        let file = File::open(path)
            .map_err(|e| EngineError::io(format!("failed to open journal {}", path.display()), e))?;
        let file_size = file
            .metadata()
            .map_err(|e| EngineError::io("failed to read journal metadata", e))?
            .len();

        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
            file_size,
        })
    }

    /// Offset of the next record
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next record, `None` at a clean end of file
    pub fn read_next(&mut self) -> EngineResult<Option<JournalRecord>> {
        if self.offset >= self.file_size {
            return Ok(None);
        }
        let start = self.offset;
        let remaining = self.file_size - start;

        if remaining < LENGTH_SIZE + CHECKSUM_SIZE {
            return Err(EngineError::corruption(
                start,
                format!("truncated record: {} bytes remaining", remaining),
            ));
        }

        let mut length = [0u8; 4];
        self.reader
            .read_exact(&mut length)
            .map_err(|e| EngineError::corruption(start, format!("failed to read record length: {}", e)))?;
        let payload_len = u32::from_le_bytes(length) as u64;

        if LENGTH_SIZE + payload_len + CHECKSUM_SIZE > remaining {
            return Err(EngineError::corruption(
                start,
                format!("record length {} exceeds remaining {} bytes", payload_len, remaining),
            ));
        }

        let mut payload = vec![0u8; payload_len as usize];
        self.reader
            .read_exact(&mut payload)
            .map_err(|e| EngineError::corruption(start, format!("failed to read record payload: {}", e)))?;

        let mut stored = [0u8; 4];
        self.reader
            .read_exact(&mut stored)
            .map_err(|e| EngineError::corruption(start, format!("failed to read record checksum: {}", e)))?;

        let expected = u32::from_le_bytes(stored);
        let actual = checksum(&length, &payload);
        if expected != actual {
            return Err(EngineError::corruption(
                start,
                format!("checksum mismatch: expected {:08x}, computed {:08x}", expected, actual),
            ));
        }

        let record: JournalRecord = serde_json::from_slice(&payload)
            .map_err(|e| EngineError::corruption(start, format!("undecodable record: {}", e)))?;

        self.offset = start + LENGTH_SIZE + payload_len + CHECKSUM_SIZE;
        Ok(Some(record))
    }

    /// Reads every remaining record
    pub fn read_all(&mut self) -> EngineResult<Vec<JournalRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}
