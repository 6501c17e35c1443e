//! # Read Views
//!
//! Projections of a `Catalog` into the shapes request handlers render.
//!
//! Every view is computed from the linked graph alone; nothing here
//! touches the backing store. Views are owned values so that callers can
//! release the generation lock before serializing them.

use crate::catalog::Catalog;
use crate::primitives::PRODUCT_PAGE_SIZE;
use crate::{CacheError, Comment, CommentId, History, HistoryId, ProductId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// VIEW TYPES
// =============================================================================

/// A comment joined with its author's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: String,
    pub content: String,
    pub content_preview: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub description_preview: String,
    pub image_path: String,
    pub price: i64,
    pub comment_count: usize,
    pub recent_comments: Vec<CommentView>,
}

/// Full product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image_path: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<CommentView>,
    pub already_bought: bool,
}

/// A purchase joined with the product bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEntry {
    pub history_id: HistoryId,
    pub product_id: ProductId,
    pub product_name: String,
    pub description_preview: String,
    pub image_path: String,
    pub price: i64,
    pub purchased_at: DateTime<Utc>,
}

/// A user's purchases, most recent first, with the amount spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseHistory {
    pub user_id: UserId,
    pub user_name: String,
    pub entries: Vec<PurchaseEntry>,
    pub total: i64,
}

// =============================================================================
// QUERIES
// =============================================================================

impl Catalog {
    /// One page of the catalog listing, ids descending; page 0 holds the newest products.
    pub fn product_page(&self, page: usize) -> Result<Vec<ProductSummary>, CacheError> {
        self.products()
            .iter()
            .rev()
            .skip(page.saturating_mul(PRODUCT_PAGE_SIZE))
            .take(PRODUCT_PAGE_SIZE)
            .map(|product| {
                Ok(ProductSummary {
                    id: product.id,
                    name: product.name.clone(),
                    description_preview: product.description_preview.clone(),
                    image_path: product.image_path.clone(),
                    price: product.price,
                    comment_count: product.comments.len(),
                    recent_comments: self.comment_views(&product.recent_comments)?,
                })
            })
            .collect()
    }

    /// Product page with every comment.
    ///
    /// `already_bought` is only ever true for a known `viewer`.
    pub fn product_detail(
        &self,
        id: ProductId,
        viewer: Option<UserId>,
    ) -> Result<ProductDetail, CacheError> {
        let product = self.product(id)?;
        // A viewer unknown to this generation has bought nothing in it.
        let already_bought = viewer
            .and_then(|viewer| self.user(viewer).ok())
            .is_some_and(|user| {
                user.histories.iter().any(|&h| {
                    self.history(h)
                        .map(|history| history.product_id == id)
                        .unwrap_or(false)
                })
            });

        Ok(ProductDetail {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            image_path: product.image_path.clone(),
            price: product.price,
            created_at: product.created_at,
            comments: self.comment_views(&product.comments)?,
            already_bought,
        })
    }

    /// Every comment on a product, oldest first.
    pub fn comments_for(&self, id: ProductId) -> Result<Vec<Comment>, CacheError> {
        self.resolve_comments(&self.product(id)?.comments)
    }

    /// The product's recent-comment view, newest first.
    pub fn last5_comments_for(&self, id: ProductId) -> Result<Vec<Comment>, CacheError> {
        self.resolve_comments(&self.product(id)?.recent_comments)
    }

    /// Every purchase record of a product, oldest first.
    pub fn histories_for(&self, id: ProductId) -> Result<Vec<History>, CacheError> {
        self.product(id)?
            .histories
            .iter()
            .map(|&h| self.history(h).cloned())
            .collect()
    }

    /// The "mypage" view: purchases newest first plus the total spent.
    pub fn purchase_history(&self, id: UserId) -> Result<PurchaseHistory, CacheError> {
        let user = self.user(id)?;
        let mut entries = Vec::with_capacity(user.histories.len());
        let mut total: i64 = 0;

        for &history_id in user.histories.iter().rev() {
            let history = self.history(history_id)?;
            let product = self.product(history.product_id)?;
            total = total.saturating_add(product.price);
            entries.push(PurchaseEntry {
                history_id,
                product_id: product.id,
                product_name: product.name.clone(),
                description_preview: product.description_preview.clone(),
                image_path: product.image_path.clone(),
                price: product.price,
                purchased_at: history.created_at,
            });
        }

        Ok(PurchaseHistory {
            user_id: user.id,
            user_name: user.name.clone(),
            entries,
            total,
        })
    }

    fn resolve_comments(&self, ids: &[CommentId]) -> Result<Vec<Comment>, CacheError> {
        ids.iter().map(|&c| self.comment(c).cloned()).collect()
    }

    fn comment_views(&self, ids: &[CommentId]) -> Result<Vec<CommentView>, CacheError> {
        ids.iter()
            .map(|&c| {
                let comment = self.comment(c)?;
                let author = self.user(comment.user_id)?;
                Ok(CommentView {
                    id: comment.id,
                    product_id: comment.product_id,
                    user_id: comment.user_id,
                    user_name: author.name.clone(),
                    content: comment.content.clone(),
                    content_preview: comment.content_preview.clone(),
                    created_at: comment.created_at,
                })
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
