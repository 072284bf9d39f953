//! Storage core: two-tier buffered reads and writes
//!
//! Writes land first in a transient [`Buffer`] and are later transported in
//! batch into a [`PermanentStore`]. The same logical mapping may therefore
//! have entries in both tiers at once; [`BufferedStore`] is the orchestrator
//! that reconciles the two on every operation.
//!
//! # Contracts
//!
//! - [`Store`] is the read surface shared by every store: point and
//!   historical lookups over derived field state, plus audit logs.
//! - [`PermanentStore`] additionally accepts transported writes.
//! - [`Buffer`] reconciles its pending writes against caller-supplied
//!   baselines and can transport its contents into a permanent store.
//!
//! Both tiers must be independently safe for concurrent use; the
//! orchestrator adds no locking of its own (see [`BufferedStore`]).

mod archive;
mod buffered;
mod errors;
mod queue;
mod replay;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use archive::Archive;
pub use buffered::BufferedStore;
pub use errors::{StoreError, StoreResult};
pub use queue::WriteQueue;

use crate::model::{Operator, Value, Write};
use crate::time::Time;

/// Structural role of a store, checked once at construction time to keep a
/// buffered store out of another buffered store's buffer or destination
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Transient tier holding not-yet-transported writes.
    Buffer,
    /// Durable tier holding committed historical state.
    Permanent,
    /// Orchestrator composing a buffer and a permanent store.
    Buffered,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Buffer => write!(f, "buffer"),
            StoreKind::Permanent => write!(f, "permanent"),
            StoreKind::Buffered => write!(f, "buffered"),
        }
    }
}

/// One line of a store's audit log.
///
/// Audit results are ordered vectors, not timestamp-keyed maps: a merged
/// log must keep destination entries strictly before buffer entries, in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// When the mutation happened.
    pub time: Time,
    /// Human-readable description of the mutation.
    pub description: String,
}

impl AuditEntry {
    /// Builds the audit entry for a storable write.
    pub fn for_write(write: &Write) -> Self {
        Self {
            time: write.version(),
            description: write.to_string(),
        }
    }
}

/// The read surface shared by every store.
///
/// Point methods answer as of "right now"; `_at` variants answer as of a
/// historical timestamp. All results are derived by replaying mutation
/// history, never read from a materialized field.
pub trait Store: Send + Sync {
    /// Structural role of this store.
    fn kind(&self) -> StoreKind;

    /// The set of keys that currently map at least one value in `record`.
    fn describe(&self, record: u64) -> StoreResult<BTreeSet<String>>;

    /// [`Store::describe`] as of `timestamp`.
    fn describe_at(&self, record: u64, timestamp: Time) -> StoreResult<BTreeSet<String>>;

    /// The set of values currently mapped to `key` in `record`.
    fn fetch(&self, key: &str, record: u64) -> StoreResult<BTreeSet<Value>>;

    /// [`Store::fetch`] as of `timestamp`.
    fn fetch_at(&self, key: &str, record: u64, timestamp: Time) -> StoreResult<BTreeSet<Value>>;

    /// The records where some value mapped to `key` satisfies `operator`
    /// with `operands`.
    fn find(
        &self,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>>;

    /// [`Store::find`] as of `timestamp`.
    fn find_at(
        &self,
        timestamp: Time,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>>;

    /// The records where some text value mapped to `key` contains `query`,
    /// case-insensitively. An empty query matches nothing.
    fn search(&self, key: &str, query: &str) -> StoreResult<BTreeSet<u64>>;

    /// Whether `record` currently maps any data at all.
    fn ping(&self, record: u64) -> StoreResult<bool>;

    /// Whether `value` is currently mapped to `key` in `record`.
    fn verify(&self, key: &str, value: &Value, record: u64) -> StoreResult<bool>;

    /// [`Store::verify`] as of `timestamp`.
    fn verify_at(
        &self,
        key: &str,
        value: &Value,
        record: u64,
        timestamp: Time,
    ) -> StoreResult<bool>;

    /// The ordered mutation log for `record`.
    fn audit(&self, record: u64) -> StoreResult<Vec<AuditEntry>>;

    /// The ordered mutation log for `key` in `record`.
    fn audit_key(&self, key: &str, record: u64) -> StoreResult<Vec<AuditEntry>>;
}

/// A durable store that accepts transported writes.
pub trait PermanentStore: Store {
    /// Durably applies `write`. Invoked during transport, not by the
    /// buffered read/write path.
    fn accept(&self, write: Write) -> StoreResult<()>;
}

/// The transient tier.
///
/// Reads on a buffer reconcile its pending writes against a baseline
/// supplied by the caller: the permanent tier's answer for the same
/// question. Own-scope methods (`find`, `search`, `ping`, `audit`) answer
/// from pending writes alone.
pub trait Buffer: Send + Sync {
    /// Structural role of this store.
    fn kind(&self) -> StoreKind;

    /// Admits a storable write, returning whether it was appended.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotStorable`] for probe writes.
    fn insert(&self, write: Write) -> StoreResult<bool>;

    /// Reconciles pending writes equivalent to `probe` against `baseline`:
    /// each one flips the answer.
    fn verify(&self, probe: &Write, baseline: bool) -> StoreResult<bool>;

    /// [`Buffer::verify`] considering only writes at or before `timestamp`.
    fn verify_at(&self, probe: &Write, timestamp: Time, baseline: bool) -> StoreResult<bool>;

    /// Adjusts a baseline value set with pending writes for `key`/`record`.
    fn fetch(
        &self,
        key: &str,
        record: u64,
        baseline: BTreeSet<Value>,
    ) -> StoreResult<BTreeSet<Value>>;

    /// [`Buffer::fetch`] considering only writes at or before `timestamp`.
    fn fetch_at(
        &self,
        key: &str,
        record: u64,
        timestamp: Time,
        baseline: BTreeSet<Value>,
    ) -> StoreResult<BTreeSet<Value>>;

    /// Adjusts a baseline key-to-values map with pending writes for
    /// `record` and returns the resulting key set. Pending adds may
    /// introduce keys the baseline lacks; pending removes may drop keys
    /// whose last value disappears.
    fn describe(
        &self,
        record: u64,
        baseline: BTreeMap<String, BTreeSet<Value>>,
    ) -> StoreResult<BTreeSet<String>>;

    /// [`Buffer::describe`] considering only writes at or before
    /// `timestamp`.
    fn describe_at(
        &self,
        record: u64,
        timestamp: Time,
        baseline: BTreeMap<String, BTreeSet<Value>>,
    ) -> StoreResult<BTreeSet<String>>;

    /// Records matched by pending writes alone.
    fn find(
        &self,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>>;

    /// [`Buffer::find`] as of `timestamp`.
    fn find_at(
        &self,
        timestamp: Time,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>>;

    /// Records whose pending text values for `key` contain `query`.
    fn search(&self, key: &str, query: &str) -> StoreResult<BTreeSet<u64>>;

    /// Whether pending writes alone give `record` any data.
    fn ping(&self, record: u64) -> StoreResult<bool>;

    /// Audit log of pending writes for `record`.
    fn audit(&self, record: u64) -> StoreResult<Vec<AuditEntry>>;

    /// Audit log of pending writes for `key` in `record`.
    fn audit_key(&self, key: &str, record: u64) -> StoreResult<Vec<AuditEntry>>;

    /// Flushes pending writes into `destination` in arrival order,
    /// returning how many were moved. A write leaves the buffer only after
    /// the destination accepts it, so a failed transport keeps the unmoved
    /// suffix buffered.
    fn transport(&self, destination: &dyn PermanentStore) -> StoreResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_store_kind_display() {
        assert_eq!(StoreKind::Buffer.to_string(), "buffer");
        assert_eq!(StoreKind::Permanent.to_string(), "permanent");
        assert_eq!(StoreKind::Buffered.to_string(), "buffered");
    }

    #[test]
    fn test_audit_entry_for_write() {
        let write = Write::add("name", Value::from("jeff"), 7);
        let entry = AuditEntry::for_write(&write);
        assert_eq!(entry.time, write.version());
        assert_eq!(entry.description, "ADD name AS \"jeff\" IN 7");
    }
}
