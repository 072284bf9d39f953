//! Journal durability tests
//!
//! A journal-backed archive must carry transported writes across a
//! restart, and must refuse to load a log it cannot trust.

use std::collections::BTreeSet;

use tempfile::TempDir;
use tidedb::journal::JournalWriter;
use tidedb::model::{Value, Write};
use tidedb::store::{Archive, Buffer, BufferedStore, PermanentStore, Store, WriteQueue};

/// Writes transported into a journal-backed archive survive reopen, with
/// versions intact for historical reads.
#[test]
fn test_transported_writes_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let cutoff;

    {
        let store =
            BufferedStore::new(WriteQueue::new(), Archive::open(temp_dir.path()).unwrap())
                .unwrap();
        store.add("name", Value::from("jeff"), 1).unwrap();
        cutoff = tidedb::time::now();
        store.remove("name", Value::from("jeff"), 1).unwrap();
        store.add("name", Value::from("jeffery"), 1).unwrap();
        store.buffer().transport(store.destination()).unwrap();
    }

    let archive = Archive::open(temp_dir.path()).unwrap();
    assert_eq!(archive.len().unwrap(), 3);
    assert_eq!(
        archive.fetch("name", 1).unwrap(),
        BTreeSet::from([Value::from("jeffery")])
    );
    assert_eq!(
        archive.fetch_at("name", 1, cutoff).unwrap(),
        BTreeSet::from([Value::from("jeff")])
    );
}

/// Direct accepts and transported writes land in the same log.
#[test]
fn test_accept_is_journaled() {
    let temp_dir = TempDir::new().unwrap();

    {
        let archive = Archive::open(temp_dir.path()).unwrap();
        archive
            .accept(Write::add("name", Value::from("jeff"), 1))
            .unwrap();
    }

    let archive = Archive::open(temp_dir.path()).unwrap();
    assert!(archive.verify("name", &Value::from("jeff"), 1).unwrap());
}

/// Non-finite floats are journaled losslessly: a NaN or infinity accepted
/// into the archive must not poison the log for every other write.
#[test]
fn test_non_finite_floats_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let archive = Archive::open(temp_dir.path()).unwrap();
        archive
            .accept(Write::add("name", Value::from("jeff"), 1))
            .unwrap();
        archive
            .accept(Write::add("score", Value::from(f64::NAN), 1))
            .unwrap();
        archive
            .accept(Write::add("score", Value::from(f64::INFINITY), 1))
            .unwrap();
        archive
            .accept(Write::add("score", Value::from(f64::NEG_INFINITY), 1))
            .unwrap();
    }

    let archive = Archive::open(temp_dir.path()).unwrap();
    assert_eq!(archive.len().unwrap(), 4);
    assert!(archive.verify("name", &Value::from("jeff"), 1).unwrap());
    assert!(archive.verify("score", &Value::from(f64::NAN), 1).unwrap());
    assert_eq!(
        archive.fetch("score", 1).unwrap(),
        BTreeSet::from([
            Value::from(f64::NAN),
            Value::from(f64::INFINITY),
            Value::from(f64::NEG_INFINITY),
        ])
    );
}

/// A tampered log is a fatal corruption error at open, not silent data
/// loss.
#[test]
fn test_tampered_log_fails_to_open() {
    let temp_dir = TempDir::new().unwrap();

    {
        let archive = Archive::open(temp_dir.path()).unwrap();
        archive
            .accept(Write::add("name", Value::from("jeff"), 1))
            .unwrap();
    }

    let path = JournalWriter::log_path(temp_dir.path());
    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    std::fs::write(&path, &bytes).unwrap();

    assert!(Archive::open(temp_dir.path()).is_err());
}

/// A truncated log is detected the same way.
#[test]
fn test_truncated_log_fails_to_open() {
    let temp_dir = TempDir::new().unwrap();

    {
        let archive = Archive::open(temp_dir.path()).unwrap();
        archive
            .accept(Write::add("name", Value::from("jeff"), 1))
            .unwrap();
        archive
            .accept(Write::add("age", Value::from(30), 1))
            .unwrap();
    }

    let path = JournalWriter::log_path(temp_dir.path());
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

    assert!(Archive::open(temp_dir.path()).is_err());
}

/// An ephemeral archive keeps nothing across instances; only the
/// journal-backed variant is durable.
#[test]
fn test_ephemeral_archive_is_ephemeral() {
    {
        let archive = Archive::new();
        archive
            .accept(Write::add("name", Value::from("jeff"), 1))
            .unwrap();
        assert_eq!(archive.len().unwrap(), 1);
    }
    let archive = Archive::new();
    assert!(archive.is_empty().unwrap());
}
