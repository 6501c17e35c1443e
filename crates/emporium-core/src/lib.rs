//! # emporium-core
//!
//! The in-memory catalog cache for Emporium - THE CACHE.
//!
//! This crate loads the storefront's flat relational rows once, links them
//! into an owner graph (user ↔ comment ↔ product ↔ history), precomputes
//! the derived display fields, and keeps the graph consistent while
//! request handlers append purchases and comments. The read path never
//! goes back to the backing store.
//!
//! ## Layers
//!
//! - `types`: ids, rows, linked entities, `CacheError`
//! - `derive`: previews and the last-N view
//! - `catalog`: entity store, identity index, graph linker
//! - `mutation`: the two incremental writers
//! - `query`: read views for request handlers
//! - `cache`: lifecycle (reload, reset) and the shared service handle
//! - `storage`: the `BackingStore` trait with in-memory and redb stores
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies
//! - Entities reference each other by typed id only
//! - Whole-graph replacement is build-then-swap

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod catalog;
pub mod derive;
pub mod mutation;
pub mod primitives;
pub mod query;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CacheError, Comment, CommentId, CommentRow, EntityKind, History, HistoryId, HistoryRow,
    Product, ProductId, ProductRow, TableRows, User, UserId, UserRow,
};

// =============================================================================
// RE-EXPORTS: Cache Engine
// =============================================================================

pub use cache::{Cache, CacheStats, Generation};
pub use catalog::Catalog;
pub use derive::{last_n, preview};
pub use mutation::MutationApplier;
pub use primitives::ResetThresholds;
pub use query::{CommentView, ProductDetail, ProductSummary, PurchaseEntry, PurchaseHistory};
pub use storage::{BackingStore, MemoryStore, RedbStore};
