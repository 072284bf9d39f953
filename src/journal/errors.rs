//! Journal error types
//!
//! I/O and encoding failures abort the operation; corruption is fatal and
//! carries the offset of the bad frame so the log can be inspected.

use std::io;

use thiserror::Error;

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Disk I/O failure while opening, appending or reading.
    #[error("journal i/o failure: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A frame failed length or checksum validation.
    #[error("journal corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// A write could not be encoded or decoded.
    #[error("journal record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl JournalError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corruption {
            offset,
            reason: reason.into(),
        }
    }
}
