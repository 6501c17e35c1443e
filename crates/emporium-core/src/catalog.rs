//! # Catalog
//!
//! The linked entity graph for one cache generation.
//!
//! A `Catalog` is three things at once:
//! - the **entity store**: one append-ordered `Vec` arena per entity type
//! - the **identity index**: id → arena slot per type, plus email → user
//! - the **graph linker**: `link_comment` / `link_history` attach a child to
//!   both owners, used identically by the bulk load and the mutation path
//!
//! Arena slots are the sequential internal keys; they are never reused
//! because nothing is ever removed.

use crate::derive::last_n;
use crate::primitives::RECENT_COMMENT_COUNT;
use crate::{
    CacheError, Comment, CommentId, EntityKind, History, HistoryId, Product, ProductId, TableRows,
    User, UserId,
};
use std::collections::HashMap;

/// One fully linked snapshot of users, products, comments and histories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    users: Vec<User>,
    products: Vec<Product>,
    comments: Vec<Comment>,
    histories: Vec<History>,

    user_index: HashMap<UserId, usize>,
    email_index: HashMap<String, usize>,
    product_index: HashMap<ProductId, usize>,
    comment_index: HashMap<CommentId, usize>,
    history_index: HashMap<HistoryId, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a linked catalog from the four full-table reads.
    ///
    /// Steps run in a fixed order: owners are indexed (with their
    /// description previews) before any child is linked, and every comment
    /// is linked before the recent-comment views are derived.
    ///
    /// Any row that would break referential integrity fails the whole
    /// build with `CacheError::LoadFailure`.
    pub fn build(rows: TableRows) -> Result<Self, CacheError> {
        let TableRows {
            users,
            products,
            comments,
            histories,
        } = rows;

        ensure_ascending("users", users.iter().map(|r| r.id.0))?;
        ensure_ascending("products", products.iter().map(|r| r.id.0))?;
        ensure_ascending("comments", comments.iter().map(|r| r.id.0))?;
        ensure_ascending("histories", histories.iter().map(|r| r.id.0))?;

        let mut catalog = Self {
            users: Vec::with_capacity(users.len()),
            products: Vec::with_capacity(products.len()),
            comments: Vec::with_capacity(comments.len()),
            histories: Vec::with_capacity(histories.len()),
            user_index: HashMap::with_capacity(users.len()),
            email_index: HashMap::with_capacity(users.len()),
            product_index: HashMap::with_capacity(products.len()),
            comment_index: HashMap::with_capacity(comments.len()),
            history_index: HashMap::with_capacity(histories.len()),
        };

        for row in users {
            catalog.insert_user(User::from(row))?;
        }
        for row in products {
            catalog.insert_product(Product::from(row));
        }

        for row in comments {
            let id = row.id;
            catalog
                .link_comment(Comment::from(row))
                .map_err(|e| CacheError::LoadFailure(format!("comment {id}: {e}")))?;
        }
        for row in histories {
            let id = row.id;
            catalog
                .link_history(History::from(row))
                .map_err(|e| CacheError::LoadFailure(format!("history {id}: {e}")))?;
        }

        for product in &mut catalog.products {
            product.recent_comments = last_n(&product.comments, RECENT_COMMENT_COUNT);
        }

        Ok(catalog)
    }

    // =========================================================================
    // IDENTITY INDEX
    // =========================================================================

    pub fn user(&self, id: UserId) -> Result<&User, CacheError> {
        self.user_index
            .get(&id)
            .map(|&slot| &self.users[slot])
            .ok_or(CacheError::UserNotFound(id))
    }

    pub fn user_by_email(&self, email: &str) -> Result<&User, CacheError> {
        self.email_index
            .get(email)
            .map(|&slot| &self.users[slot])
            .ok_or_else(|| CacheError::EmailNotFound(email.to_string()))
    }

    pub fn product(&self, id: ProductId) -> Result<&Product, CacheError> {
        self.product_index
            .get(&id)
            .map(|&slot| &self.products[slot])
            .ok_or(CacheError::ProductNotFound(id))
    }

    pub fn comment(&self, id: CommentId) -> Result<&Comment, CacheError> {
        self.comment_index
            .get(&id)
            .map(|&slot| &self.comments[slot])
            .ok_or(CacheError::CommentNotFound(id))
    }

    pub fn history(&self, id: HistoryId) -> Result<&History, CacheError> {
        self.history_index
            .get(&id)
            .map(|&slot| &self.histories[slot])
            .ok_or(CacheError::HistoryNotFound(id))
    }

    // =========================================================================
    // ENTITY STORE
    // =========================================================================

    /// All users in ascending id order.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// All products in ascending id order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// All comments in append order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// All histories in append order.
    pub fn histories(&self) -> &[History] {
        &self.histories
    }

    /// Id the next appended comment will receive (current maximum + 1).
    #[must_use]
    pub fn next_comment_id(&self) -> CommentId {
        CommentId(self.comments.last().map_or(1, |c| c.id.0.saturating_add(1)))
    }

    /// Id the next appended history will receive (current maximum + 1).
    #[must_use]
    pub fn next_history_id(&self) -> HistoryId {
        HistoryId(self.histories.last().map_or(1, |h| h.id.0.saturating_add(1)))
    }

    fn insert_user(&mut self, user: User) -> Result<(), CacheError> {
        if self.email_index.contains_key(&user.email) {
            return Err(CacheError::LoadFailure(format!(
                "user {}: duplicate email {}",
                user.id, user.email
            )));
        }
        let slot = self.users.len();
        self.user_index.insert(user.id, slot);
        self.email_index.insert(user.email.clone(), slot);
        self.users.push(user);
        Ok(())
    }

    fn insert_product(&mut self, product: Product) {
        let slot = self.products.len();
        self.product_index.insert(product.id, slot);
        self.products.push(product);
    }

    // =========================================================================
    // GRAPH LINKER
    // =========================================================================

    /// Append a comment to the store and to both owners' sequences.
    ///
    /// Owners are resolved before anything is written, so a missing owner
    /// leaves the catalog untouched. Does not refresh the product's
    /// recent-comment view; see `refresh_recent_comments`.
    pub fn link_comment(&mut self, comment: Comment) -> Result<CommentId, CacheError> {
        let (user_slot, product_slot) = self.owner_slots(comment.user_id, comment.product_id)?;
        let id = comment.id;
        if self.comment_index.contains_key(&id) {
            return Err(CacheError::InvalidInput(format!("comment {id} already linked")));
        }

        self.comment_index.insert(id, self.comments.len());
        self.comments.push(comment);
        self.users[user_slot].comments.push(id);
        self.products[product_slot].comments.push(id);
        Ok(id)
    }

    /// Append a history to the store and to both owners' sequences.
    pub fn link_history(&mut self, history: History) -> Result<HistoryId, CacheError> {
        let (user_slot, product_slot) = self.owner_slots(history.user_id, history.product_id)?;
        let id = history.id;
        if self.history_index.contains_key(&id) {
            return Err(CacheError::InvalidInput(format!("history {id} already linked")));
        }

        self.history_index.insert(id, self.histories.len());
        self.histories.push(history);
        self.users[user_slot].histories.push(id);
        self.products[product_slot].histories.push(id);
        Ok(id)
    }

    /// Re-derive a product's recent-comment view from the tail of its sequence.
    pub fn refresh_recent_comments(&mut self, id: ProductId) -> Result<(), CacheError> {
        let slot = *self
            .product_index
            .get(&id)
            .ok_or(CacheError::ProductNotFound(id))?;
        let product = &mut self.products[slot];
        product.recent_comments = last_n(&product.comments, RECENT_COMMENT_COUNT);
        Ok(())
    }

    fn owner_slots(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(usize, usize), CacheError> {
        let user_slot = *self
            .user_index
            .get(&user)
            .ok_or(CacheError::StaleReference {
                kind: EntityKind::User,
                id: user.0,
            })?;
        let product_slot = *self
            .product_index
            .get(&product)
            .ok_or(CacheError::StaleReference {
                kind: EntityKind::Product,
                id: product.0,
            })?;
        Ok((user_slot, product_slot))
    }
}

/// Reject tables whose ids are zero, repeated, or out of order.
fn ensure_ascending(table: &str, ids: impl Iterator<Item = u64>) -> Result<(), CacheError> {
    let mut previous = 0u64;
    for id in ids {
        if id == 0 {
            return Err(CacheError::LoadFailure(format!("{table}: id 0 is not a valid id")));
        }
        if id <= previous {
            return Err(CacheError::LoadFailure(format!(
                "{table}: id {id} follows {previous}, rows must be strictly ascending"
            )));
        }
        previous = id;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
