//! # Mutation Appliers
//!
//! The only writers to a catalog after it has been built.
//!
//! Each applier extends the live graph with one new entity without a
//! reload:
//! - allocate the next id (current maximum + 1)
//! - link it to both owners through the catalog's graph linker
//! - refresh whatever derived fields the new entity affects
//!
//! Appliers are all-or-nothing: owners are resolved before anything is
//! written, so a stale id leaves the catalog exactly as it was. Callers
//! serialize appliers on the same catalog (the cache holds the generation
//! write lock for the duration of one call).

use crate::catalog::Catalog;
use crate::{CacheError, Comment, CommentRow, History, ProductId, UserId};
use chrono::{DateTime, Utc};

/// Stateless entry points for incremental catalog writes.
pub struct MutationApplier;

impl MutationApplier {
    /// Record that `buyer` purchased `product` at `at`.
    ///
    /// Fails with `CacheError::StaleReference` when either id is missing
    /// from this catalog.
    pub fn record_purchase(
        catalog: &mut Catalog,
        buyer: UserId,
        product: ProductId,
        at: DateTime<Utc>,
    ) -> Result<History, CacheError> {
        let history = History {
            id: catalog.next_history_id(),
            product_id: product,
            user_id: buyer,
            created_at: at,
        };
        catalog.link_history(history.clone())?;
        Ok(history)
    }

    /// Post `content` as a comment by `author` on `product` at `at`.
    ///
    /// The content preview is computed here, and the product's
    /// recent-comment view is re-derived right after the append.
    pub fn post_comment(
        catalog: &mut Catalog,
        author: UserId,
        product: ProductId,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Comment, CacheError> {
        let comment = Comment::from(CommentRow {
            id: catalog.next_comment_id(),
            product_id: product,
            user_id: author,
            content: content.into(),
            created_at: at,
        });
        catalog.link_comment(comment.clone())?;
        catalog.refresh_recent_comments(product)?;
        Ok(comment)
    }
}

// =============================================================================
// TESTS
// =============================================================================
