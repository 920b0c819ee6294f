//! # Storage Module
//!
//! Durable record storage using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Each entity type owns one table keyed by `u64` id with postcard-encoded
//! values. Ids come from a per-table counter in the `sequences` table and
//! are never reused.

mod redb_store;

pub use redb_store::{Reader, Record, Snapshot, Store, Tx};
