//! # redb Record Store
//!
//! [`Store`] wraps a redb [`Database`]. Reads go through a [`Snapshot`]
//! (one MVCC read transaction), writes through a [`Tx`] handed to the
//! closure passed to [`Store::write`]. The closure's `Err` aborts the
//! transaction, so a multi-record operation is all-or-nothing.

use crate::error::{CoreError, Result};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Per-table id counters.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// RECORD TRAIT
// =============================================================================

/// An entity persisted in its own table.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// redb table name.
    const TABLE: &'static str;
    /// Entity name used in error messages.
    const KIND: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

fn table_def<R: Record>() -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(R::TABLE)
}

fn raw_def(name: &str) -> TableDefinition<'_, u64, &'static [u8]> {
    TableDefinition::new(name)
}

fn decode<R: Record>(bytes: &[u8]) -> Result<R> {
    Ok(postcard::from_bytes(bytes)?)
}

fn read_one<R, T>(table: &T, id: u64) -> Result<Option<R>>
where
    R: Record,
    T: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

fn read_all<R, T>(table: &T) -> Result<Vec<R>>
where
    R: Record,
    T: ReadableTable<u64, &'static [u8]>,
{
    let mut out = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        out.push(decode(value.value())?);
    }
    Ok(out)
}

// =============================================================================
// READER
// =============================================================================

/// Query access shared by [`Snapshot`] and [`Tx`].
///
/// `list` returns records in ascending id order.
pub trait Reader {
    fn get<R: Record>(&self, id: u64) -> Result<Option<R>>;

    fn list<R: Record>(&self) -> Result<Vec<R>>;

    /// Like `get`, but a missing record is `NotFound`.
    fn fetch<R: Record>(&self, id: u64) -> Result<R> {
        self.get(id)?
            .ok_or_else(|| CoreError::not_found(R::KIND, "id", id))
    }

    fn exists<R: Record>(&self, id: u64) -> Result<bool> {
        Ok(self.get::<R>(id)?.is_some())
    }

    /// Fail with `NotFound` unless `id` exists.
    fn ensure<R: Record>(&self, id: u64) -> Result<()> {
        self.fetch::<R>(id).map(|_| ())
    }

    fn filter<R: Record>(&self, mut pred: impl FnMut(&R) -> bool) -> Result<Vec<R>> {
        let mut all = self.list::<R>()?;
        all.retain(|r| pred(r));
        Ok(all)
    }

    fn find<R: Record>(&self, mut pred: impl FnMut(&R) -> bool) -> Result<Option<R>> {
        Ok(self.list::<R>()?.into_iter().find(|r| pred(r)))
    }

    /// `Conflict` when any `R` matches, naming the record that is still in use.
    fn ensure_unreferenced<R: Record>(
        &self,
        owner: &str,
        pred: impl FnMut(&R) -> bool,
    ) -> Result<()> {
        if self.list::<R>()?.iter().any(pred) {
            return Err(CoreError::conflict(format!(
                "{owner} is still referenced by {} records",
                R::KIND
            )));
        }
        Ok(())
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A consistent read-only view of the database.
pub struct Snapshot {
    txn: redb::ReadTransaction,
}

impl Snapshot {
    /// Number of records in a table, by name.
    pub fn count(&self, table: &str) -> Result<u64> {
        match self.txn.open_table(raw_def(table)) {
            Ok(t) => Ok(t.len()?),
            Err(TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl Reader for Snapshot {
    fn get<R: Record>(&self, id: u64) -> Result<Option<R>> {
        match self.txn.open_table(table_def::<R>()) {
            Ok(table) => read_one(&table, id),
            Err(TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list<R: Record>(&self) -> Result<Vec<R>> {
        match self.txn.open_table(table_def::<R>()) {
            Ok(table) => read_all(&table),
            Err(TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// WRITE TRANSACTION
// =============================================================================

/// A write transaction. Committed by [`Store::write`] when the closure succeeds.
pub struct Tx {
    txn: redb::WriteTransaction,
}

impl Tx {
    /// Reserve the next id for `R`.
    pub fn next_id<R: Record>(&mut self) -> Result<u64> {
        let mut seq = self.txn.open_table(SEQUENCES)?;
        let current = seq.get(R::TABLE)?.map(|g| g.value()).unwrap_or(0);
        let next = current.saturating_add(1);
        seq.insert(R::TABLE, next)?;
        Ok(next)
    }

    /// Assign a fresh id and store the record.
    pub fn insert<R: Record>(&mut self, mut record: R) -> Result<R> {
        let id = self.next_id::<R>()?;
        record.set_id(id);
        self.put(&record)?;
        Ok(record)
    }

    /// Store a record under its own id, replacing any previous value.
    pub fn put<R: Record>(&mut self, record: &R) -> Result<()> {
        let bytes = postcard::to_allocvec(record)?;
        let mut table = self.txn.open_table(table_def::<R>())?;
        table.insert(record.id(), bytes.as_slice())?;
        Ok(())
    }

    /// Replace an existing record. `NotFound` if the id is unknown.
    pub fn update<R: Record>(&mut self, record: &R) -> Result<()> {
        self.ensure::<R>(record.id())?;
        self.put(record)
    }

    /// Delete a record and return it. `NotFound` if the id is unknown.
    pub fn remove<R: Record>(&mut self, id: u64) -> Result<R> {
        let mut table = self.txn.open_table(table_def::<R>())?;
        let removed = match table.remove(id)? {
            Some(guard) => Some(decode::<R>(guard.value())?),
            None => None,
        };
        removed.ok_or_else(|| CoreError::not_found(R::KIND, "id", id))
    }
}

impl Reader for Tx {
    fn get<R: Record>(&self, id: u64) -> Result<Option<R>> {
        let table = self.txn.open_table(table_def::<R>())?;
        read_one(&table, id)
    }

    fn list<R: Record>(&self) -> Result<Vec<R>> {
        let table = self.txn.open_table(table_def::<R>())?;
        read_all(&table)
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Handle to the SchoolHub database file.
pub struct Store {
    db: Database,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create the database at `path` and make sure every table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())?;
        let txn = db.begin_write()?;
        {
            txn.open_table(SEQUENCES)?;
            for name in crate::TABLES {
                txn.open_table(raw_def(name))?;
            }
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// Begin a read-only snapshot.
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            txn: self.db.begin_read()?,
        })
    }

    /// Run `f` against a snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Snapshot) -> Result<T>) -> Result<T> {
        let snapshot = self.snapshot()?;
        f(&snapshot)
    }

    /// Run `f` in a write transaction, committing on `Ok` and aborting on `Err`.
    pub fn write<T>(&self, f: impl FnOnce(&mut Tx) -> Result<T>) -> Result<T> {
        let mut tx = Tx {
            txn: self.db.begin_write()?,
        };
        match f(&mut tx) {
            Ok(value) => {
                tx.txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.txn.abort()?;
                Err(err)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
