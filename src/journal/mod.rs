//! Durable write log
//!
//! Append-only framed log of accepted writes, backing a journal-backed
//! permanent store. Each frame is:
//!
//! ```text
//! +----------------+
//! | Payload Length | (u32 LE)
//! +----------------+
//! | Payload        | (serde_json-encoded Write)
//! +----------------+
//! | Checksum       | (u32 LE, CRC32 over the payload)
//! +----------------+
//! ```
//!
//! Every append is fsynced before it is acknowledged. Every read validates
//! the length bounds and the checksum; any mismatch is a fatal corruption
//! error carrying the frame offset.

mod errors;
mod reader;
mod writer;

pub use errors::{JournalError, JournalResult};
pub use reader::JournalReader;
pub use writer::JournalWriter;
