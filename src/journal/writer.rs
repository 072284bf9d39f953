//! Journal writer with fsync enforcement
//!
//! Append-only, no in-place updates. A write is durable once `append`
//! returns: the frame is flushed and fsynced before the call is
//! acknowledged.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use crate::model::Write;

use super::errors::{JournalError, JournalResult};

/// Directory under the data dir that holds the log.
const JOURNAL_DIR: &str = "journal";
/// Log file name.
const JOURNAL_FILE: &str = "writes.log";

/// Appender for the durable write log.
pub struct JournalWriter {
    /// Path to the log file
    path: PathBuf,
    /// Underlying file handle, opened in append mode
    file: File,
    /// Byte offset of the next frame
    current_offset: u64,
}

impl JournalWriter {
    /// Opens or creates `<data_dir>/journal/writes.log`, creating parent
    /// directories as needed.
    pub fn open(data_dir: &Path) -> JournalResult<Self> {
        let journal_dir = data_dir.join(JOURNAL_DIR);
        let path = journal_dir.join(JOURNAL_FILE);

        if !journal_dir.exists() {
            fs::create_dir_all(&journal_dir).map_err(|e| {
                JournalError::io(
                    format!("failed to create journal directory: {}", journal_dir.display()),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                JournalError::io(format!("failed to open journal: {}", path.display()), e)
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| JournalError::io("failed to read journal metadata", e))?
            .len();

        Ok(Self {
            path,
            file,
            current_offset,
        })
    }

    /// Path of the log file inside `data_dir`.
    pub fn log_path(data_dir: &Path) -> PathBuf {
        data_dir.join(JOURNAL_DIR).join(JOURNAL_FILE)
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the byte offset where the next frame will land.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends one write, fsyncs, and returns the frame's byte offset.
    pub fn append(&mut self, write: &Write) -> JournalResult<u64> {
        let payload = serde_json::to_vec(write)?;
        let checksum = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(payload.len() + 8);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&checksum.to_le_bytes());

        let offset = self.current_offset;
        self.file
            .write_all(&frame)
            .map_err(|e| JournalError::io(format!("failed to append write: {}", write), e))?;

        // Durability boundary: nothing is acknowledged before fsync
        self.file
            .sync_all()
            .map_err(|e| JournalError::io(format!("fsync failed after write: {}", write), e))?;

        self.current_offset += frame.len() as u64;
        Ok(offset)
    }
}
