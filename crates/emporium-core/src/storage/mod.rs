//! # Backing Stores
//!
//! The relational source the cache is loaded from.
//!
//! The cache only ever asks a store for four full-table reads (each
//! ordered by ascending id) and, on an administrative reset, for a
//! destructive truncation above fixed id thresholds. Everything else is
//! served from memory.
//!
//! - `MemoryStore`: rows held in process, for tests and demos
//! - `RedbStore`: disk-backed tables in a redb database

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::primitives::ResetThresholds;
use crate::{CacheError, CommentRow, HistoryRow, ProductRow, TableRows, UserRow};

/// Read access to the relational tables plus the reset operation.
///
/// Implementations must be shareable across threads; the cache holds
/// one behind an `Arc` for its whole lifetime.
pub trait BackingStore: Send + Sync {
    /// All users, ascending by id.
    fn fetch_users(&self) -> Result<Vec<UserRow>, CacheError>;

    /// All products, ascending by id.
    fn fetch_products(&self) -> Result<Vec<ProductRow>, CacheError>;

    /// All comments, ascending by id.
    fn fetch_comments(&self) -> Result<Vec<CommentRow>, CacheError>;

    /// All histories, ascending by id.
    fn fetch_histories(&self) -> Result<Vec<HistoryRow>, CacheError>;

    /// Delete every row whose id is above the table's threshold.
    fn reset(&self, thresholds: &ResetThresholds) -> Result<(), CacheError>;

    /// All four tables. Stores with snapshot reads should override this to
    /// read every table in one transaction.
    fn fetch_all(&self) -> Result<TableRows, CacheError> {
        Ok(TableRows {
            users: self.fetch_users()?,
            products: self.fetch_products()?,
            comments: self.fetch_comments()?,
            histories: self.fetch_histories()?,
        })
    }
}
