//! # redb-backed Relational Store
//!
//! The four storefront tables kept in a redb embedded database.
//!
//! Each table maps the row id (`u64`) to the postcard-encoded row, so a
//! table iteration is already the "ORDER BY id" read the cache needs.
//! redb gives us:
//! - ACID write transactions for seeding and reset
//! - MVCC snapshot reads, so `fetch_all` sees one consistent state

use super::BackingStore;
use crate::primitives::ResetThresholds;
use crate::{CacheError, CommentRow, HistoryRow, ProductRow, TableRows, UserRow};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for users: UserId(u64) -> serialized UserRow
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Table for products: ProductId(u64) -> serialized ProductRow
const PRODUCTS: TableDefinition<u64, &[u8]> = TableDefinition::new("products");

/// Table for comments: CommentId(u64) -> serialized CommentRow
const COMMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("comments");

/// Table for histories: HistoryId(u64) -> serialized HistoryRow
const HISTORIES: TableDefinition<u64, &[u8]> = TableDefinition::new("histories");

fn io_error(e: impl std::fmt::Display) -> CacheError {
    CacheError::IoError(e.to_string())
}

/// A row that knows its primary key.
trait Keyed {
    fn key(&self) -> u64;
}

impl Keyed for UserRow {
    fn key(&self) -> u64 {
        self.id.0
    }
}

impl Keyed for ProductRow {
    fn key(&self) -> u64 {
        self.id.0
    }
}

impl Keyed for CommentRow {
    fn key(&self) -> u64 {
        self.id.0
    }
}

impl Keyed for HistoryRow {
    fn key(&self) -> u64 {
        self.id.0
    }
}

/// A disk-backed relational store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(io_error)?;
        for table in [USERS, PRODUCTS, COMMENTS, HISTORIES] {
            let _ = write_txn.open_table(table).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)?;

        Ok(Self { db })
    }

    /// Insert (or overwrite) every row of `rows` in a single transaction.
    ///
    /// Returns the number of rows written.
    pub fn insert_rows(&self, rows: &TableRows) -> Result<usize, CacheError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        let mut written = 0;
        written += write_table(&write_txn, USERS, &rows.users)?;
        written += write_table(&write_txn, PRODUCTS, &rows.products)?;
        written += write_table(&write_txn, COMMENTS, &rows.comments)?;
        written += write_table(&write_txn, HISTORIES, &rows.histories)?;
        write_txn.commit().map_err(io_error)?;
        Ok(written)
    }

    fn fetch<T: DeserializeOwned>(
        &self,
        table: TableDefinition<u64, &[u8]>,
    ) -> Result<Vec<T>, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        read_table(&read_txn, table)
    }
}

fn write_table<T: Serialize + Keyed>(
    txn: &WriteTransaction,
    definition: TableDefinition<u64, &[u8]>,
    rows: &[T],
) -> Result<usize, CacheError> {
    let mut table = txn.open_table(definition).map_err(io_error)?;
    for row in rows {
        let bytes = postcard::to_allocvec(row)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;
        table.insert(row.key(), bytes.as_slice()).map_err(io_error)?;
    }
    Ok(rows.len())
}

fn read_table<T: DeserializeOwned>(
    txn: &ReadTransaction,
    definition: TableDefinition<u64, &[u8]>,
) -> Result<Vec<T>, CacheError> {
    let table = txn.open_table(definition).map_err(io_error)?;
    let mut rows = Vec::new();
    for entry in table.iter().map_err(io_error)? {
        let (_, value) = entry.map_err(io_error)?;
        let row = postcard::from_bytes(value.value())
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Remove every key above `threshold`. Returns how many rows went.
fn truncate_above(
    txn: &WriteTransaction,
    definition: TableDefinition<u64, &[u8]>,
    threshold: u64,
) -> Result<usize, CacheError> {
    let mut table = txn.open_table(definition).map_err(io_error)?;
    let doomed = table
        .range(threshold.saturating_add(1)..)
        .map_err(io_error)?
        .map(|entry| entry.map(|(key, _)| key.value()))
        .collect::<Result<Vec<u64>, _>>()
        .map_err(io_error)?;
    for key in &doomed {
        table.remove(*key).map_err(io_error)?;
    }
    Ok(doomed.len())
}

impl BackingStore for RedbStore {
    fn fetch_users(&self) -> Result<Vec<UserRow>, CacheError> {
        self.fetch(USERS)
    }

    fn fetch_products(&self) -> Result<Vec<ProductRow>, CacheError> {
        self.fetch(PRODUCTS)
    }

    fn fetch_comments(&self) -> Result<Vec<CommentRow>, CacheError> {
        self.fetch(COMMENTS)
    }

    fn fetch_histories(&self) -> Result<Vec<HistoryRow>, CacheError> {
        self.fetch(HISTORIES)
    }

    fn fetch_all(&self) -> Result<TableRows, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        Ok(TableRows {
            users: read_table(&read_txn, USERS)?,
            products: read_table(&read_txn, PRODUCTS)?,
            comments: read_table(&read_txn, COMMENTS)?,
            histories: read_table(&read_txn, HISTORIES)?,
        })
    }

    fn reset(&self, thresholds: &ResetThresholds) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        let removed = truncate_above(&write_txn, USERS, thresholds.users)?
            + truncate_above(&write_txn, PRODUCTS, thresholds.products)?
            + truncate_above(&write_txn, COMMENTS, thresholds.comments)?
            + truncate_above(&write_txn, HISTORIES, thresholds.histories)?;
        write_txn.commit().map_err(io_error)?;
        tracing::info!(removed, "Backing store reset");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
