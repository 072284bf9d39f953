//! Journal reader with strict corruption detection
//!
//! Every frame read validates the declared length against the bytes
//! remaining in the file and the CRC32 over the payload. A mismatch means
//! the log cannot be trusted past that offset, so reading aborts with a
//! corruption error instead of skipping the frame.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::model::Write;

use super::errors::{JournalError, JournalResult};

/// Shortest legal frame: length header, empty payload, checksum.
const MIN_FRAME_SIZE: u64 = 4 + 4;

/// Sequential reader over the durable write log.
pub struct JournalReader {
    /// Path to the log file
    path: PathBuf,
    /// Buffered reader
    reader: BufReader<File>,
    /// Current byte offset
    current_offset: u64,
    /// Total file size
    file_size: u64,
}

impl JournalReader {
    /// Opens the log file for reading.
    pub fn open(path: &Path) -> JournalResult<Self> {
        let file = File::open(path)
            .map_err(|e| JournalError::io(format!("failed to open journal: {}", path.display()), e))?;

        let file_size = file
            .metadata()
            .map_err(|e| JournalError::io("failed to read journal metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current read offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next frame.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(write))` if a frame was read and validated
    /// - `Ok(None)` at end of file
    /// - `Err(JournalError::Corruption)` on any length or checksum mismatch
    pub fn read_next(&mut self) -> JournalResult<Option<Write>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_FRAME_SIZE {
            return Err(JournalError::corruption(
                self.current_offset,
                format!(
                    "truncated journal: {} bytes remaining, minimum frame is {}",
                    remaining, MIN_FRAME_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader
            .read_exact(&mut len_buf)
            .map_err(|e| self.corrupt(format!("failed to read frame length: {}", e)))?;
        let payload_len = u32::from_le_bytes(len_buf) as u64;

        if payload_len + MIN_FRAME_SIZE > remaining {
            return Err(self.corrupt(format!(
                "frame length {} exceeds remaining file size {}",
                payload_len, remaining
            )));
        }

        let mut payload = vec![0u8; payload_len as usize];
        self.reader
            .read_exact(&mut payload)
            .map_err(|e| self.corrupt(format!("failed to read frame payload: {}", e)))?;

        let mut checksum_buf = [0u8; 4];
        self.reader
            .read_exact(&mut checksum_buf)
            .map_err(|e| self.corrupt(format!("failed to read frame checksum: {}", e)))?;
        let expected = u32::from_le_bytes(checksum_buf);

        if crc32fast::hash(&payload) != expected {
            return Err(self.corrupt("checksum mismatch"));
        }

        let write: Write = serde_json::from_slice(&payload)?;
        self.current_offset += MIN_FRAME_SIZE + payload_len;
        Ok(Some(write))
    }

    /// Reads and validates every frame in the log.
    pub fn read_all(&mut self) -> JournalResult<Vec<Write>> {
        let mut writes = Vec::new();
        while let Some(write) = self.read_next()? {
            writes.push(write);
        }
        Ok(writes)
    }

    fn corrupt(&self, reason: impl Into<String>) -> JournalError {
        JournalError::corruption(self.current_offset, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::super::JournalWriter;
    use super::*;
    use crate::model::Value;
    use std::io::Write as IoWrite;
    use tempfile::TempDir;

    fn seed(temp_dir: &TempDir, count: u64) {
        let mut writer = JournalWriter::open(temp_dir.path()).unwrap();
        for i in 0..count {
            writer
                .append(&Write::add("count", Value::from(i as i64), i))
                .unwrap();
        }
    }

    #[test]
    fn test_read_all_in_append_order() {
        let temp_dir = TempDir::new().unwrap();
        seed(&temp_dir, 5);

        let mut reader =
            JournalReader::open(&JournalWriter::log_path(temp_dir.path())).unwrap();
        let writes = reader.read_all().unwrap();
        assert_eq!(writes.len(), 5);
        for (i, write) in writes.iter().enumerate() {
            assert_eq!(write.record(), i as u64);
        }
    }

    #[test]
    fn test_flipped_payload_byte_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        seed(&temp_dir, 1);

        let path = JournalWriter::log_path(temp_dir.path());
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[6] ^= 0x01;
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        let result = reader.read_next();
        assert!(matches!(result, Err(JournalError::Corruption { .. })));
    }

    #[test]
    fn test_truncated_frame_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        seed(&temp_dir, 1);

        let path = JournalWriter::log_path(temp_dir.path());
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        let result = reader.read_next();
        assert!(matches!(result, Err(JournalError::Corruption { .. })));
    }

    #[test]
    fn test_oversized_length_header_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let path = JournalWriter::log_path(temp_dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&u32::MAX.to_le_bytes()).unwrap();
        file.write_all(&[0u8; 8]).unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        let result = reader.read_next();
        assert!(matches!(result, Err(JournalError::Corruption { .. })));
    }

    #[test]
    fn test_empty_log_reads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let _writer = JournalWriter::open(temp_dir.path()).unwrap();

        let mut reader =
            JournalReader::open(&JournalWriter::log_path(temp_dir.path())).unwrap();
        assert!(reader.read_next().unwrap().is_none());
    }
}
