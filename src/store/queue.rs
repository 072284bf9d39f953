//! In-memory write buffer
//!
//! The buffer is an arrival-ordered queue of storable writes. Every read
//! replays the pending run over the caller's baseline; nothing is indexed
//! or materialized. Ordering is the only invariant: transport drains from
//! the front so the destination sees writes in the order they were
//! admitted.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::RwLock;

use crate::model::{Operator, Value, Write};
use crate::time::Time;

use super::errors::{StoreError, StoreResult};
use super::replay;
use super::{AuditEntry, Buffer, PermanentStore, StoreKind};

/// Arrival-ordered buffer of not-yet-transported writes.
///
/// Thread-safe: the queue lives behind an `RwLock`, so reads replay a
/// stable snapshot and concurrent inserts serialize.
#[derive(Debug, Default)]
pub struct WriteQueue {
    writes: RwLock<VecDeque<Write>>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending writes.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, VecDeque<Write>>> {
        self.writes
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, VecDeque<Write>>> {
        self.writes
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Buffer for WriteQueue {
    fn kind(&self) -> StoreKind {
        StoreKind::Buffer
    }

    fn insert(&self, write: Write) -> StoreResult<bool> {
        if !write.is_storable() {
            return Err(StoreError::NotStorable);
        }
        tracing::debug!(write = %write, version = write.version(), "write admitted");
        self.write()?.push_back(write);
        Ok(true)
    }

    fn verify(&self, probe: &Write, baseline: bool) -> StoreResult<bool> {
        let queue = self.read()?;
        Ok(replay::toggle_existence(queue.iter(), probe, None, baseline))
    }

    fn verify_at(&self, probe: &Write, timestamp: Time, baseline: bool) -> StoreResult<bool> {
        let queue = self.read()?;
        Ok(replay::toggle_existence(
            queue.iter(),
            probe,
            Some(timestamp),
            baseline,
        ))
    }

    fn fetch(
        &self,
        key: &str,
        record: u64,
        baseline: BTreeSet<Value>,
    ) -> StoreResult<BTreeSet<Value>> {
        let queue = self.read()?;
        Ok(replay::fold_field(queue.iter(), key, record, None, baseline))
    }

    fn fetch_at(
        &self,
        key: &str,
        record: u64,
        timestamp: Time,
        baseline: BTreeSet<Value>,
    ) -> StoreResult<BTreeSet<Value>> {
        let queue = self.read()?;
        Ok(replay::fold_field(
            queue.iter(),
            key,
            record,
            Some(timestamp),
            baseline,
        ))
    }

    fn describe(
        &self,
        record: u64,
        baseline: BTreeMap<String, BTreeSet<Value>>,
    ) -> StoreResult<BTreeSet<String>> {
        let queue = self.read()?;
        let state = replay::fold_record(queue.iter(), record, None, baseline);
        Ok(state.into_keys().collect())
    }

    fn describe_at(
        &self,
        record: u64,
        timestamp: Time,
        baseline: BTreeMap<String, BTreeSet<Value>>,
    ) -> StoreResult<BTreeSet<String>> {
        let queue = self.read()?;
        let state = replay::fold_record(queue.iter(), record, Some(timestamp), baseline);
        Ok(state.into_keys().collect())
    }

    fn find(
        &self,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>> {
        let matcher = operator.matcher(operands)?;
        let queue = self.read()?;
        let state = replay::fold_key(queue.iter(), key, None);
        Ok(state
            .into_iter()
            .filter(|(_, values)| values.iter().any(|v| matcher.matches(v)))
            .map(|(record, _)| record)
            .collect())
    }

    fn find_at(
        &self,
        timestamp: Time,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>> {
        let matcher = operator.matcher(operands)?;
        let queue = self.read()?;
        let state = replay::fold_key(queue.iter(), key, Some(timestamp));
        Ok(state
            .into_iter()
            .filter(|(_, values)| values.iter().any(|v| matcher.matches(v)))
            .map(|(record, _)| record)
            .collect())
    }

    fn search(&self, key: &str, query: &str) -> StoreResult<BTreeSet<u64>> {
        if query.is_empty() {
            return Ok(BTreeSet::new());
        }
        let needle = query.to_lowercase();
        let queue = self.read()?;
        let state = replay::fold_key(queue.iter(), key, None);
        Ok(state
            .into_iter()
            .filter(|(_, values)| {
                values
                    .iter()
                    .filter_map(|v| v.as_text())
                    .any(|t| t.to_lowercase().contains(&needle))
            })
            .map(|(record, _)| record)
            .collect())
    }

    fn ping(&self, record: u64) -> StoreResult<bool> {
        let queue = self.read()?;
        let state = replay::fold_record(queue.iter(), record, None, BTreeMap::new());
        Ok(!state.is_empty())
    }

    fn audit(&self, record: u64) -> StoreResult<Vec<AuditEntry>> {
        let queue = self.read()?;
        Ok(queue
            .iter()
            .filter(|w| w.record() == record)
            .map(AuditEntry::for_write)
            .collect())
    }

    fn audit_key(&self, key: &str, record: u64) -> StoreResult<Vec<AuditEntry>> {
        let queue = self.read()?;
        Ok(queue
            .iter()
            .filter(|w| w.record() == record && w.key() == key)
            .map(AuditEntry::for_write)
            .collect())
    }

    fn transport(&self, destination: &dyn PermanentStore) -> StoreResult<usize> {
        let mut queue = self.write()?;
        let mut moved = 0;
        while let Some(write) = queue.front().cloned() {
            // Leave the write queued until the destination has it
            destination.accept(write)?;
            queue.pop_front();
            moved += 1;
        }
        if moved > 0 {
            tracing::info!(moved, "buffer transported");
        }
        Ok(moved)
    }
}
