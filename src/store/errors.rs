//! Store error types
//!
//! Taxonomy:
//! - `NestedComposition` is a construction-time configuration error and is
//!   fatal: the store must not be used.
//! - `NotStorable` rejects probe writes at the buffer admission boundary.
//! - `InvalidQuery` covers bad operator arity and unparseable patterns.
//! - Journal failures propagate unchanged; this layer adds no retries.
//!
//! An `add`/`remove` that has nothing to do is NOT an error; it is a
//! `false` return.

use thiserror::Error;

use super::StoreKind;
use crate::journal::JournalError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A buffered store was offered as the buffer or destination of
    /// another buffered store, which would make every read recurse.
    #[error("cannot embed a {inner} store inside a {outer} store")]
    NestedComposition { inner: StoreKind, outer: StoreKind },

    /// A probe write was offered for admission.
    #[error("probe writes exist for comparison only and cannot be stored")]
    NotStorable,

    /// Malformed query operands.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A lock guarding shared store state was poisoned by a panic.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),

    /// Durable log failure from a journal-backed store.
    #[error(transparent)]
    Journal(#[from] JournalError),
}
