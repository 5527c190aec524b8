//! Crash recovery and corruption handling of the database file.
//!
//! Each test writes a database, damages the file the way a crash or a bad
//! disk would, and checks what reopening it does.

use bucketdb_core::journal::{FILE_HEADER_SIZE, FILE_MAGIC};
use bucketdb_core::{
    ConnectConfig, Connection, CoreError, ErrorKind, Handler, PartitionStore, Querier, Refiner,
    StoreOptions,
};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn config(dir: &Path) -> ConnectConfig {
    ConnectConfig::new("test.db").directory(dir).partition("p")
}

/// Writes `count` entries and returns the file path and the size after each commit.
fn populate(temp: &TempDir, count: u32) -> (PathBuf, Vec<u64>) {
    let conn = Connection::connect(config(temp.path())).unwrap();
    let bucket = conn.exec_on("p");
    let mut sizes = Vec::new();
    for i in 0..count {
        bucket.insert(&i, &format!("value-{i}")).unwrap();
        sizes.push(conn.stats().unwrap().journal_bytes);
    }
    let path = conn.path().to_path_buf();
    conn.close().unwrap();
    (path, sizes)
}

fn surviving(temp: &TempDir, count: u32) -> Vec<u32> {
    let conn = Connection::connect(config(temp.path())).unwrap();
    let bucket = conn.exec_on("p");
    let found = (0..count)
        .filter(|i| bucket.find(Some(i)).one::<String>().is_ok())
        .collect();
    conn.close().unwrap();
    found
}

#[test]
fn every_truncation_point_recovers_a_prefix() {
    let temp = tempdir().unwrap();
    let (path, sizes) = populate(&temp, 5);
    let original = fs::read(&path).unwrap();
    let start = sizes[1] as usize;

    // Cut anywhere inside the last three records.
    for cut in start..original.len() {
        fs::write(&path, &original[..cut]).unwrap();
        let committed = sizes.iter().filter(|s| **s as usize <= cut).count() as u32;

        let found = surviving(&temp, 5);
        assert_eq!(found, (0..committed).collect::<Vec<_>>(), "cut at {cut}");
    }
}

#[test]
fn recovery_truncates_the_file() {
    let temp = tempdir().unwrap();
    let (path, sizes) = populate(&temp, 2);

    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(sizes[1] - 1).unwrap();
    drop(file);

    let conn = Connection::connect(config(temp.path())).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), sizes[0]);
    conn.close().unwrap();
}

#[test]
fn checksum_damage_refuses_to_open() {
    let temp = tempdir().unwrap();
    let (path, sizes) = populate(&temp, 3);

    let mut bytes = fs::read(&path).unwrap();
    // Last byte of the second entry's value.
    let index = sizes[1] as usize - 5;
    bytes[index] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let err = Connection::connect(config(temp.path())).unwrap_err();
    assert!(matches!(err, CoreError::ChecksumMismatch { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Open);
}

#[test]
fn garbage_after_a_record_refuses_to_open() {
    let temp = tempdir().unwrap();
    let (path, _) = populate(&temp, 1);

    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(b"XXXXXXXXXXXXXXXXXXXXXXXX");
    fs::write(&path, &bytes).unwrap();

    let err = Connection::connect(config(temp.path())).unwrap_err();
    assert!(matches!(err, CoreError::JournalCorruption { .. }), "{err}");
}

#[test]
fn newer_format_version_refuses_to_open() {
    let temp = tempdir().unwrap();
    let (path, _) = populate(&temp, 1);

    let mut bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..FILE_MAGIC.len()], &FILE_MAGIC);
    bytes[8..10].copy_from_slice(&u16::MAX.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let err = Connection::connect(config(temp.path())).unwrap_err();
    assert!(matches!(err, CoreError::InvalidFormat { .. }));
}

#[test]
fn crash_while_writing_the_header() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("test.db");
    fs::write(&path, &FILE_MAGIC[..5]).unwrap();

    let store = PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
    assert!(store.has_partition(b"default").unwrap());
    store.close().unwrap();
    assert!(fs::metadata(&path).unwrap().len() > FILE_HEADER_SIZE as u64);
}

#[test]
fn stale_compaction_file_is_ignored_and_replaced() {
    let temp = tempdir().unwrap();
    let (path, _) = populate(&temp, 3);

    // Leftover from a crash before the rename.
    let scratch = temp.path().join("test.db.compact");
    fs::write(&scratch, b"half a snapshot").unwrap();

    let conn = Connection::connect(config(temp.path())).unwrap();
    assert_eq!(conn.stats().unwrap().entries, 3);
    conn.compact().unwrap();
    assert!(!scratch.exists());
    conn.close().unwrap();

    assert_eq!(surviving(&temp, 3), vec![0, 1, 2]);
    assert!(path.exists());
}

#[test]
fn unsynced_commits_still_replay_after_close() {
    let temp = tempdir().unwrap();
    let config = config(temp.path()).sync_on_commit(false);

    let conn = Connection::connect(config.clone()).unwrap();
    conn.exec_on("p").insert("k", "v").unwrap();
    conn.close().unwrap();

    let conn = Connection::connect(config).unwrap();
    assert_eq!(conn.exec_on("p").find(Some("k")).one::<String>().unwrap(), "v");
    conn.close().unwrap();
}
