//! # Core Type Definitions
//!
//! This module contains all core types for the Emporium catalog cache:
//! - Typed entity identifiers (`UserId`, `ProductId`, `CommentId`, `HistoryId`)
//! - Flat relational rows as fetched from the backing store (`*Row`, `TableRows`)
//! - Linked, cache-resident entities (`User`, `Product`, `Comment`, `History`)
//! - Error types (`CacheError`)
//!
//! ## Reference Model
//!
//! Entities never own each other. A `Comment` refers to its author and
//! product through ids, and owners keep ordered id sequences of their
//! children. Every id is resolved through the identity index on demand.

use crate::derive::preview;
use crate::primitives::{COMMENT_PREVIEW_CHARS, DESCRIPTION_PREVIEW_CHARS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Identifier of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Identifier of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u64);

/// Identifier of a product comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommentId(pub u64);

/// Identifier of a purchase history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub u64);

macro_rules! display_id {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_id!(UserId, ProductId, CommentId, HistoryId);

/// Entity kind, used to describe which side of a link was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Product,
    Comment,
    History,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Product => "product",
            Self::Comment => "comment",
            Self::History => "history",
        };
        f.write_str(name)
    }
}

// =============================================================================
// RELATIONAL ROWS
// =============================================================================

/// A `users` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub last_login: DateTime<Utc>,
}

/// A `products` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image_path: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

/// A `comments` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: CommentId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A `histories` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub id: HistoryId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// The four full-table reads, each ordered by ascending id.
///
/// This is also the on-disk shape of a seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRows {
    #[serde(default)]
    pub users: Vec<UserRow>,
    #[serde(default)]
    pub products: Vec<ProductRow>,
    #[serde(default)]
    pub comments: Vec<CommentRow>,
    #[serde(default)]
    pub histories: Vec<HistoryRow>,
}

// =============================================================================
// LINKED ENTITIES
// =============================================================================

/// A cached user with its owned comment and purchase sequences.
///
/// Sequences are in append order: oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub last_login: DateTime<Utc>,
    pub comments: Vec<CommentId>,
    pub histories: Vec<HistoryId>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            last_login: row.last_login,
            comments: Vec::new(),
            histories: Vec::new(),
        }
    }
}

/// A cached product with its owned sequences and derived display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image_path: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<CommentId>,
    pub histories: Vec<HistoryId>,
    /// Description cut to `DESCRIPTION_PREVIEW_CHARS`.
    pub description_preview: String,
    /// The most recent `RECENT_COMMENT_COUNT` comments, newest first.
    pub recent_comments: Vec<CommentId>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let description_preview = preview(&row.description, DESCRIPTION_PREVIEW_CHARS);
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image_path: row.image_path,
            price: row.price,
            created_at: row.created_at,
            comments: Vec::new(),
            histories: Vec::new(),
            description_preview,
            recent_comments: Vec::new(),
        }
    }
}

/// A cached comment. `user_id`/`product_id` are the back-references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Content cut to `COMMENT_PREVIEW_CHARS`.
    pub content_preview: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        let content_preview = preview(&row.content, COMMENT_PREVIEW_CHARS);
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            content_preview,
        }
    }
}

/// A cached purchase record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    pub id: HistoryId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryRow> for History {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the catalog cache.
///
/// - Lookups that miss are `*NotFound` and are recoverable
/// - Mutations against an id missing from the current generation are `StaleReference`
/// - `LoadFailure` means a reload could not produce a coherent snapshot
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be read, or its rows do not link.
    #[error("Cache load failed: {0}")]
    LoadFailure(String),

    /// No user with this id.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// No user with this email.
    #[error("User not found for email: {0}")]
    EmailNotFound(String),

    /// No product with this id.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// No comment with this id.
    #[error("Comment not found: {0}")]
    CommentNotFound(CommentId),

    /// No history record with this id.
    #[error("History not found: {0}")]
    HistoryNotFound(HistoryId),

    /// A mutation referenced an owner absent from the current generation.
    #[error("Stale reference: {kind} {id} is not in the current cache generation")]
    StaleReference { kind: EntityKind, id: u64 },

    /// An I/O error occurred in the backing store.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A row could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Caller-supplied input was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CacheError {
    /// True for every "no such entity" outcome, stale references included.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::EmailNotFound(_)
                | Self::ProductNotFound(_)
                | Self::CommentNotFound(_)
                | Self::HistoryNotFound(_)
                | Self::StaleReference { .. }
        )
    }

    /// True when the process must not keep serving with the current cache.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LoadFailure(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
