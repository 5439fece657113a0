//! Isolation tests for the bucket engine.
//!
//! Readers run concurrently with a single writer and must only ever observe
//! fully committed states.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{sync::Arc, thread};

use entkv_store::{Database, ReadTxn, WriteTxn};

const LEFT: &[u8] = b"left";
const RIGHT: &[u8] = b"right";

fn counter(txn: &impl ReadTxn, bucket: &[u8]) -> u64 {
    let raw = txn.get(bucket, b"n").expect("get").expect("counter present");
    u64::from_be_bytes(raw.try_into().expect("8 bytes"))
}

#[test]
fn test_readers_never_see_partial_commits() {
    let db = Arc::new(Database::open_in_memory());
    db.update(|txn| {
        txn.create_bucket_if_not_exists(LEFT)?;
        txn.create_bucket_if_not_exists(RIGHT)?;
        txn.put(LEFT, b"n", &0u64.to_be_bytes())?;
        txn.put(RIGHT, b"n", &0u64.to_be_bytes())
    })
    .expect("seed");

    let writer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            for i in 1..=200u64 {
                db.update(|txn| {
                    txn.put(LEFT, b"n", &i.to_be_bytes())?;
                    txn.put(RIGHT, b"n", &i.to_be_bytes())
                })
                .expect("write");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for _ in 0..200 {
                    let txn = db.read();
                    assert_eq!(counter(&txn, LEFT), counter(&txn, RIGHT));
                }
            })
        })
        .collect();

    writer.join().expect("writer");
    for reader in readers {
        reader.join().expect("reader");
    }

    let stats = db.stats();
    assert_eq!(stats.version, 201);
    assert_eq!(counter(&db.read(), LEFT), 200);
}

#[test]
fn test_aborted_write_releases_writer_lock() {
    let db = Database::open_in_memory();
    {
        let mut txn = db.write().expect("first writer");
        txn.create_bucket_if_not_exists(LEFT).expect("create");
        // Dropped without commit.
    }
    let txn = db.write().expect("second writer");
    assert!(!txn.bucket_exists(LEFT));
    txn.abort();
    assert_eq!(db.stats().aborts, 2);
}
