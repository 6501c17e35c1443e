//! In-process backing store.

use super::BackingStore;
use crate::primitives::ResetThresholds;
use crate::{CacheError, CommentRow, HistoryRow, ProductRow, TableRows, UserRow};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Rows held in memory.
///
/// Tables are kept sorted by id. The store can be switched into a failing
/// mode in which every read reports an I/O error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<TableRows>,
    failing: AtomicBool,
}

impl MemoryStore {
    /// Create a store holding `rows`.
    #[must_use]
    pub fn new(rows: TableRows) -> Self {
        Self {
            rows: RwLock::new(sorted(rows)),
            failing: AtomicBool::new(false),
        }
    }

    /// Replace every table.
    pub fn replace(&self, rows: TableRows) {
        *self.rows.write().unwrap_or_else(PoisonError::into_inner) = sorted(rows);
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn read<T>(&self, f: impl FnOnce(&TableRows) -> T) -> Result<T, CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::IoError("memory store unavailable".to_string()));
        }
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&rows))
    }
}

fn sorted(mut rows: TableRows) -> TableRows {
    rows.users.sort_by_key(|r| r.id);
    rows.products.sort_by_key(|r| r.id);
    rows.comments.sort_by_key(|r| r.id);
    rows.histories.sort_by_key(|r| r.id);
    rows
}

impl BackingStore for MemoryStore {
    fn fetch_users(&self) -> Result<Vec<UserRow>, CacheError> {
        self.read(|rows| rows.users.clone())
    }

    fn fetch_products(&self) -> Result<Vec<ProductRow>, CacheError> {
        self.read(|rows| rows.products.clone())
    }

    fn fetch_comments(&self) -> Result<Vec<CommentRow>, CacheError> {
        self.read(|rows| rows.comments.clone())
    }

    fn fetch_histories(&self) -> Result<Vec<HistoryRow>, CacheError> {
        self.read(|rows| rows.histories.clone())
    }

    fn fetch_all(&self) -> Result<TableRows, CacheError> {
        self.read(TableRows::clone)
    }

    fn reset(&self, thresholds: &ResetThresholds) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::IoError("memory store unavailable".to_string()));
        }
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        rows.users.retain(|r| r.id.0 <= thresholds.users);
        rows.products.retain(|r| r.id.0 <= thresholds.products);
        rows.comments.retain(|r| r.id.0 <= thresholds.comments);
        rows.histories.retain(|r| r.id.0 <= thresholds.histories);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;
    use chrono::DateTime;

    fn user(id: u64) -> UserRow {
        UserRow {
            id: UserId(id),
            name: format!("user{id}"),
            email: format!("user{id}@x.com"),
            password: "pw".to_string(),
            last_login: DateTime::from_timestamp(0, 0).expect("epoch"),
        }
    }

    #[test]
    fn rows_come_back_sorted() {
        let store = MemoryStore::new(TableRows {
            users: vec![user(3), user(1), user(2)],
            ..TableRows::default()
        });
        let ids: Vec<_> = store
            .fetch_users()
            .expect("fetch")
            .iter()
            .map(|u| u.id.0)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn failing_store_reports_io_errors() {
        let store = MemoryStore::default();
        store.set_failing(true);
        assert!(matches!(store.fetch_all(), Err(CacheError::IoError(_))));
        store.set_failing(false);
        assert!(store.fetch_all().is_ok());
    }

    #[test]
    fn reset_drops_rows_above_threshold() {
        let store = MemoryStore::new(TableRows {
            users: vec![user(1), user(2), user(3)],
            ..TableRows::default()
        });
        let thresholds = ResetThresholds {
            users: 2,
            ..ResetThresholds::default()
        };
        store.reset(&thresholds).expect("reset");
        assert_eq!(store.fetch_users().expect("fetch").len(), 2);
    }
}
