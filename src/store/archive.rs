//! Permanent store over a full write history
//!
//! The archive keeps every accepted write in commit order and answers both
//! point and historical queries by replaying that history up to a cutoff.
//! Nothing is ever deleted: a removal is one more write in the log.
//!
//! An archive is ephemeral by default; [`Archive::open`] backs it with the
//! durable journal so accepted writes survive a restart. The journal is
//! written before memory, so a crash between the two leaves the write
//! recoverable rather than acknowledged-and-lost.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, RwLock};

use crate::journal::{JournalReader, JournalWriter};
use crate::model::{Operator, Value, Write};
use crate::time::Time;

use super::errors::{StoreError, StoreResult};
use super::replay;
use super::{AuditEntry, PermanentStore, Store, StoreKind};

/// Durable store holding committed historical state.
#[derive(Default)]
pub struct Archive {
    /// Accepted writes in commit order
    writes: RwLock<Vec<Write>>,
    /// Durable log, present when the archive was opened from a directory
    journal: Option<Mutex<JournalWriter>>,
}

impl Archive {
    /// Creates an ephemeral archive with no durable log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a journal-backed archive rooted at `data_dir`, replaying any
    /// existing log into memory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let journal = JournalWriter::open(data_dir)?;

        let log_path = JournalWriter::log_path(data_dir);
        let mut restored = Vec::new();
        if log_path.exists() {
            let mut reader = JournalReader::open(&log_path)?;
            restored = reader.read_all()?;
        }
        if !restored.is_empty() {
            tracing::info!(writes = restored.len(), "archive restored from journal");
        }

        Ok(Self {
            writes: RwLock::new(restored),
            journal: Some(Mutex::new(journal)),
        })
    }

    /// Number of writes in the history.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Vec<Write>>> {
        self.writes
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Store for Archive {
    fn kind(&self) -> StoreKind {
        StoreKind::Permanent
    }

    fn describe(&self, record: u64) -> StoreResult<BTreeSet<String>> {
        let writes = self.read()?;
        let state = replay::fold_record(writes.iter(), record, None, BTreeMap::new());
        Ok(state.into_keys().collect())
    }

    fn describe_at(&self, record: u64, timestamp: Time) -> StoreResult<BTreeSet<String>> {
        let writes = self.read()?;
        let state = replay::fold_record(writes.iter(), record, Some(timestamp), BTreeMap::new());
        Ok(state.into_keys().collect())
    }

    fn fetch(&self, key: &str, record: u64) -> StoreResult<BTreeSet<Value>> {
        let writes = self.read()?;
        Ok(replay::fold_field(
            writes.iter(),
            key,
            record,
            None,
            BTreeSet::new(),
        ))
    }

    fn fetch_at(&self, key: &str, record: u64, timestamp: Time) -> StoreResult<BTreeSet<Value>> {
        let writes = self.read()?;
        Ok(replay::fold_field(
            writes.iter(),
            key,
            record,
            Some(timestamp),
            BTreeSet::new(),
        ))
    }

    fn find(
        &self,
        key: &str,
        operator: Operator,
        operands: &[Value],
    ) -> StoreResult<BTreeSet<u64>> {
        let matcher = operator.matcher(operands)?;
        let writes = self.read()?;
        let state = replay::fold_key(writes.iter(), key, None);
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
        let writes = self.read()?;
        let state = replay::fold_key(writes.iter(), key, Some(timestamp));
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
        let writes = self.read()?;
        let state = replay::fold_key(writes.iter(), key, None);
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
        let writes = self.read()?;
        let state = replay::fold_record(writes.iter(), record, None, BTreeMap::new());
        Ok(!state.is_empty())
    }

    fn verify(&self, key: &str, value: &Value, record: u64) -> StoreResult<bool> {
        let probe = Write::probe(key, value.clone(), record);
        let writes = self.read()?;
        Ok(replay::toggle_existence(writes.iter(), &probe, None, false))
    }

    fn verify_at(
        &self,
        key: &str,
        value: &Value,
        record: u64,
        timestamp: Time,
    ) -> StoreResult<bool> {
        let probe = Write::probe(key, value.clone(), record);
        let writes = self.read()?;
        Ok(replay::toggle_existence(
            writes.iter(),
            &probe,
            Some(timestamp),
            false,
        ))
    }

    fn audit(&self, record: u64) -> StoreResult<Vec<AuditEntry>> {
        let writes = self.read()?;
        Ok(writes
            .iter()
            .filter(|w| w.record() == record)
            .map(AuditEntry::for_write)
            .collect())
    }

    fn audit_key(&self, key: &str, record: u64) -> StoreResult<Vec<AuditEntry>> {
        let writes = self.read()?;
        Ok(writes
            .iter()
            .filter(|w| w.record() == record && w.key() == key)
            .map(AuditEntry::for_write)
            .collect())
    }
}

impl PermanentStore for Archive {
    fn accept(&self, write: Write) -> StoreResult<()> {
        if !write.is_storable() {
            return Err(StoreError::NotStorable);
        }

        // Journal before memory: a crash here is recoverable on reopen
        if let Some(journal) = &self.journal {
            let mut journal = journal
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            journal.append(&write)?;
        }

        tracing::debug!(write = %write, version = write.version(), "write accepted");
        self.writes
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?
            .push(write);
        Ok(())
    }
}
