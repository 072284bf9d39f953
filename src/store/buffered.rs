//! Buffered store: the read/write orchestrator
//!
//! A [`BufferedStore`] holds data in a [`Buffer`] before batch transport
//! into a [`PermanentStore`]. Every operation fans out to both tiers and
//! reconciles their answers; the orchestrator itself keeps no state beyond
//! the two stores and effects no transition except write admission.
//!
//! # Merge rules
//!
//! - `verify`/`fetch`/`describe`: the destination answers first and the
//!   buffer adjusts that baseline with its pending writes (override
//!   semantics).
//! - `audit`: destination entries first, buffer entries appended; no
//!   interleave reordering.
//! - `find`/`search`: symmetric difference of the two match sets, and
//!   `ping`: XOR of the two answers. A record matching in BOTH tiers is
//!   therefore excluded. This is deliberate compatibility behavior, not an
//!   oversight in this file; see the method docs before relying on it.
//!
//! # Consistency
//!
//! No locking happens here. The store is thread-safe when its buffer and
//! destination each are, but the two sub-queries of one operation are not
//! an atomic unit: a write admitted between them can yield an answer that
//! reflects neither the before nor the after state. Compositions that need
//! a composite operation to be atomic can hold [`BufferedStore::master_lock`]
//! around it; the shared operations never take it, so readers are not
//! serialized by default.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use crate::model::{Operator, Value, Write};
use crate::time::Time;

use super::errors::{StoreError, StoreResult};
use super::{AuditEntry, Buffer, PermanentStore, Store, StoreKind};

/// Orchestrator composing a transient buffer and a permanent destination.
///
/// Constructed once; neither tier is ever swapped afterwards.
pub struct BufferedStore<B: Buffer, D: PermanentStore> {
    buffer: B,
    destination: D,
    /// Handle for compositions that need atomicity across both tiers.
    /// Never acquired by the shared operations.
    master: RwLock<()>,
}

impl<B: Buffer, D: PermanentStore> BufferedStore<B, D> {
    /// Composes `buffer` and `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NestedComposition`] if either argument is
    /// itself a buffered store: nesting one inside another's buffer or
    /// destination slot would make every read recurse without bound.
    pub fn new(buffer: B, destination: D) -> StoreResult<Self> {
        if buffer.kind() == StoreKind::Buffered {
            return Err(StoreError::NestedComposition {
                inner: buffer.kind(),
                outer: StoreKind::Buffered,
            });
        }
        if destination.kind() == StoreKind::Buffered {
            return Err(StoreError::NestedComposition {
                inner: destination.kind(),
                outer: StoreKind::Buffered,
            });
        }
        Ok(Self {
            buffer,
            destination,
            master: RwLock::new(()),
        })
    }

    /// The transient tier.
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// The permanent tier.
    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Lock handle for compositions that need a composite operation to be
    /// atomic across both tiers.
    pub fn master_lock(&self) -> &RwLock<()> {
        &self.master
    }

    /// Maps `value` to `key` in `record`, iff that mapping does not
    /// currently exist. Adding never replaces other values mapped to the
    /// same key: a field holds a set of distinct values and `add` only ever
    /// grows it.
    ///
    /// Returns whether the mapping was admitted; `false` is a no-op, not
    /// an error.
    pub fn add(&self, key: &str, value: Value, record: u64) -> StoreResult<bool> {
        let write = Write::add(key, value, record);
        if !self.exists(&write)? {
            return self.buffer.insert(write);
        }
        Ok(false)
    }

    /// Unmaps `value` from `key` in `record`, iff that mapping currently
    /// exists. No other values mapped to the key are affected.
    ///
    /// Returns whether the removal was admitted; `false` is a no-op, not
    /// an error.
    pub fn remove(&self, key: &str, value: Value, record: u64) -> StoreResult<bool> {
        let write = Write::remove(key, value, record);
        if self.exists(&write)? {
            return self.buffer.insert(write);
        }
        Ok(false)
    }

    /// Restores the value set of `key` in `record` to its state as of
    /// `timestamp`.
    ///
    /// Minimal-edit reconciliation: only values whose membership differs
    /// between the historical and current snapshots are touched, each
    /// through the normal `add`/`remove` admission path, so every step is
    /// existence-checked and auditable. The steps are independent: there is
    /// no rollback across them, and a collaborator failure partway leaves
    /// some values reverted and others not.
    pub fn revert(&self, key: &str, record: u64, timestamp: Time) -> StoreResult<()> {
        let past = self.fetch_at(key, record, timestamp)?;
        let present = self.fetch(key, record)?;
        for value in past.symmetric_difference(&present) {
            if present.contains(value) {
                self.remove(key, value.clone(), record)?;
            } else {
                self.add(key, value.clone(), record)?;
            }
        }
        Ok(())
    }

    /// Existence of `write`'s mapping in the merged view. Takes the
    /// already-built write so `add`/`remove` do not construct a duplicate.
    fn exists(&self, write: &Write) -> StoreResult<bool> {
        let baseline = self
            .destination
            .verify(write.key(), write.value(), write.record())?;
        self.buffer.verify(write, baseline)
    }
}

impl<B: Buffer, D: PermanentStore> Store for BufferedStore<B, D> {
    fn kind(&self) -> StoreKind {
        StoreKind::Buffered
    }

    fn describe(&self, record: u64) -> StoreResult<BTreeSet<String>> {
        let mut baseline = BTreeMap::new();
        for key in self.destination.describe(record)? {
            let values = self.destination.fetch(&key, record)?;
            baseline.insert(key, values);
        }
        self.buffer.describe(record, baseline)
    }

    fn describe_at(&self, record: u64, timestamp: Time) -> StoreResult<BTreeSet<String>> {
        let mut baseline = BTreeMap::new();
        for key in self.destination.describe_at(record, timestamp)? {
            let values = self.destination.fetch_at(&key, record, timestamp)?;
            baseline.insert(key, values);
        }
        self.buffer.describe_at(record, timestamp, baseline)
    }

    fn fetch(&self, key: &str, record: u64) -> StoreResult<BTreeSet<Value>> {
        let baseline = self.destination.fetch(key, record)?;
        self.buffer.fetch(key, record, baseline)
    }

    fn fetch_at(&self, key: &str, record: u64, timestamp: Time) -> StoreResult<BTreeSet<Value>> {
        let baseline = self.destination.fetch_at(key, record, timestamp)?;
        self.buffer.fetch_at(key, record, timestamp, baseline)
    }

    /// Records matched in exactly one tier. A record whose values satisfy
    /// the operator in both the buffer and the destination is EXCLUDED
    /// from the result.
    fn find(
        &self,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>> {
        let committed = self.destination.find(key, operator, operands)?;
        let pending = self.buffer.find(key, operator, operands)?;
        Ok(committed.symmetric_difference(&pending).copied().collect())
    }

    /// Historical [`Store::find`]; same exactly-one-tier merge rule.
    fn find_at(
        &self,
        timestamp: Time,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>> {
        let committed = self.destination.find_at(timestamp, key, operator, operands)?;
        let pending = self.buffer.find_at(timestamp, key, operator, operands)?;
        Ok(committed.symmetric_difference(&pending).copied().collect())
    }

    /// Records matched in exactly one tier; same merge rule as
    /// [`Store::find`].
    fn search(&self, key: &str, query: &str) -> StoreResult<BTreeSet<u64>> {
        let committed = self.destination.search(key, query)?;
        let pending = self.buffer.search(key, query)?;
        Ok(pending.symmetric_difference(&committed).copied().collect())
    }

    /// True iff exactly one tier reports the record as populated. A record
    /// with data in both tiers pings `false`.
    fn ping(&self, record: u64) -> StoreResult<bool> {
        Ok(self.buffer.ping(record)? ^ self.destination.ping(record)?)
    }

    fn verify(&self, key: &str, value: &Value, record: u64) -> StoreResult<bool> {
        let baseline = self.destination.verify(key, value, record)?;
        let probe = Write::probe(key, value.clone(), record);
        self.buffer.verify(&probe, baseline)
    }

    fn verify_at(
        &self,
        key: &str,
        value: &Value,
        record: u64,
        timestamp: Time,
    ) -> StoreResult<bool> {
        let baseline = self.destination.verify_at(key, value, record, timestamp)?;
        let probe = Write::probe(key, value.clone(), record);
        self.buffer.verify_at(&probe, timestamp, baseline)
    }

    /// Committed history first, then pending history appended. Buffer
    /// entries represent not-yet-transported mutations and logically come
    /// after everything the destination has.
    fn audit(&self, record: u64) -> StoreResult<Vec<AuditEntry>> {
        let mut log = self.destination.audit(record)?;
        log.extend(self.buffer.audit(record)?);
        Ok(log)
    }

    fn audit_key(&self, key: &str, record: u64) -> StoreResult<Vec<AuditEntry>> {
        let mut log = self.destination.audit_key(key, record)?;
        log.extend(self.buffer.audit_key(key, record)?);
        Ok(log)
    }
}
