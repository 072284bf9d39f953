//! Write-replay folds shared by both tiers
//!
//! A store's field state is never materialized; it is the left fold of an
//! ordered run of writes over a baseline. Both the buffer and the archive
//! fold with these helpers so the two tiers cannot drift on apply
//! semantics.
//!
//! A cutoff of `Some(t)` considers only writes with `version <= t`; `None`
//! considers every write. Probe writes never appear in a store, so the
//! folds assume every input write has a polarity.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Polarity, Value, Write};
use crate::time::Time;

/// Whether `write` participates in a fold bounded by `cutoff`.
pub(crate) fn within<'a>(cutoff: Option<Time>) -> impl Fn(&&'a Write) -> bool {
    move |write| cutoff.map_or(true, |t| write.version() <= t)
}

/// Applies one write to a value set.
fn apply(write: &Write, values: &mut BTreeSet<Value>) {
    match write.polarity() {
        Some(Polarity::Add) => {
            values.insert(write.value().clone());
        }
        Some(Polarity::Remove) => {
            values.remove(write.value());
        }
        None => {}
    }
}

/// Folds writes for `key`/`record` over a baseline value set.
pub(crate) fn fold_field<'a>(
    writes: impl Iterator<Item = &'a Write>,
    key: &str,
    record: u64,
    cutoff: Option<Time>,
    mut baseline: BTreeSet<Value>,
) -> BTreeSet<Value> {
    for write in writes
        .filter(|w| w.record() == record && w.key() == key)
        .filter(within(cutoff))
    {
        apply(write, &mut baseline);
    }
    baseline
}

/// Folds writes for `record` over a baseline key-to-values map, pruning
/// keys whose value set empties out.
pub(crate) fn fold_record<'a>(
    writes: impl Iterator<Item = &'a Write>,
    record: u64,
    cutoff: Option<Time>,
    mut baseline: BTreeMap<String, BTreeSet<Value>>,
) -> BTreeMap<String, BTreeSet<Value>> {
    for write in writes.filter(|w| w.record() == record).filter(within(cutoff)) {
        let values = baseline.entry(write.key().to_string()).or_default();
        apply(write, values);
        if values.is_empty() {
            baseline.remove(write.key());
        }
    }
    baseline
}

/// Folds writes for `key` into per-record value sets, pruning records whose
/// value set empties out.
pub(crate) fn fold_key<'a>(
    writes: impl Iterator<Item = &'a Write>,
    key: &str,
    cutoff: Option<Time>,
) -> BTreeMap<u64, BTreeSet<Value>> {
    let mut state: BTreeMap<u64, BTreeSet<Value>> = BTreeMap::new();
    for write in writes.filter(|w| w.key() == key).filter(within(cutoff)) {
        let values = state.entry(write.record()).or_default();
        apply(write, values);
        if values.is_empty() {
            state.remove(&write.record());
        }
    }
    state
}

/// Flips `baseline` once for every write equivalent to `probe`.
pub(crate) fn toggle_existence<'a>(
    writes: impl Iterator<Item = &'a Write>,
    probe: &Write,
    cutoff: Option<Time>,
    baseline: bool,
) -> bool {
    let mut exists = baseline;
    for _ in writes.filter(|w| *w == probe).filter(within(cutoff)) {
        exists = !exists;
    }
    exists
}
