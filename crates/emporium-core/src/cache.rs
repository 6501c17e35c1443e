//! # Cache Service
//!
//! The process-wide catalog cache and its lifecycle.
//!
//! A `Cache` owns a backing store and the currently published
//! `Generation`. It is built once at startup and shared by `Arc` with
//! every request handler.
//!
//! ## Concurrency
//!
//! - `reload` builds a complete `Catalog` without blocking readers, then
//!   publishes it with a single pointer swap. Readers see either the old
//!   generation or the new one, never a partial rebuild.
//! - Reloads and resets are serialized by a dedicated reload mutex held
//!   from fetch to publish, so an older snapshot can never be published
//!   over a newer one.
//! - Readers take the generation's read lock for the length of one view.
//! - Mutation appliers take the generation's write lock for one bounded
//!   append, which serializes id allocation and same-owner appends.
//!
//! Lock poisoning is recovered rather than propagated: every applier
//! validates before it writes, so a panicking holder cannot leave a
//! half-linked entity behind.

use crate::catalog::Catalog;
use crate::mutation::MutationApplier;
use crate::primitives::ResetThresholds;
use crate::query::{ProductDetail, ProductSummary, PurchaseHistory};
use crate::storage::BackingStore;
use crate::{CacheError, Comment, History, Product, ProductId, User, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// GENERATION
// =============================================================================

/// One published catalog snapshot.
#[derive(Debug)]
pub struct Generation {
    number: u64,
    catalog: RwLock<Catalog>,
}

impl Generation {
    fn new(number: u64, catalog: Catalog) -> Self {
        Self {
            number,
            catalog: RwLock::new(catalog),
        }
    }

    /// Monotonic reload counter; the first load is generation 1.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Shared access to the catalog.
    pub fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Entity counts of the published generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub generation: u64,
    pub users: usize,
    pub products: usize,
    pub comments: usize,
    pub histories: usize,
}

// =============================================================================
// CACHE
// =============================================================================

/// The catalog cache service.
pub struct Cache {
    store: Arc<dyn BackingStore>,
    current: RwLock<Arc<Generation>>,
    generations: AtomicU64,
    reloading: Mutex<()>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("generation", &self.generation().number())
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Create the cache and perform the initial load.
    ///
    /// A `CacheError::LoadFailure` here means the process must not serve.
    pub fn load(store: Arc<dyn BackingStore>) -> Result<Self, CacheError> {
        let cache = Self {
            store,
            current: RwLock::new(Arc::new(Generation::new(0, Catalog::new()))),
            generations: AtomicU64::new(0),
            reloading: Mutex::new(()),
        };
        cache.reload()?;
        Ok(cache)
    }

    /// Replace the whole cache with a fresh snapshot of the backing store.
    ///
    /// On failure the previously published generation stays in place and
    /// the error is always a `CacheError::LoadFailure`. Returns the new
    /// generation number.
    pub fn reload(&self) -> Result<u64, CacheError> {
        let _reloading = self.reloading.lock().unwrap_or_else(PoisonError::into_inner);
        self.reload_locked()
    }

    /// Run the backing store's destructive reset, then reload.
    ///
    /// The reload mutex is held across both steps, so no concurrent reload
    /// can publish a snapshot read before the reset.
    pub fn reset_and_reload(&self, thresholds: &ResetThresholds) -> Result<u64, CacheError> {
        let _reloading = self.reloading.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(?thresholds, "Initialize backing store");
        self.store
            .reset(thresholds)
            .map_err(|e| CacheError::LoadFailure(format!("reset failed: {e}")))?;
        self.reload_locked()
    }

    /// Fetch, build and publish. Caller holds `reloading`.
    fn reload_locked(&self) -> Result<u64, CacheError> {
        tracing::info!("Load data cache");

        let rows = self.store.fetch_all().map_err(|e| match e {
            CacheError::LoadFailure(_) => e,
            other => CacheError::LoadFailure(other.to_string()),
        })?;
        let catalog = Catalog::build(rows)?;

        let number = self.generations.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        tracing::info!(
            generation = number,
            users = catalog.users().len(),
            comments = catalog.comments().len(),
            histories = catalog.histories().len(),
            products = catalog.products().len(),
            "Loaded data cache"
        );

        let next = Arc::new(Generation::new(number, catalog));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(number)
    }

    /// The currently published generation.
    pub fn generation(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` against the current catalog under its read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        let generation = self.generation();
        let catalog = generation.read();
        f(&catalog)
    }

    pub fn stats(&self) -> CacheStats {
        let generation = self.generation();
        let catalog = generation.read();
        CacheStats {
            generation: generation.number(),
            users: catalog.users().len(),
            products: catalog.products().len(),
            comments: catalog.comments().len(),
            histories: catalog.histories().len(),
        }
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    pub fn user(&self, id: UserId) -> Result<User, CacheError> {
        self.read(|c| c.user(id).cloned())
    }

    pub fn user_by_email(&self, email: &str) -> Result<User, CacheError> {
        self.read(|c| c.user_by_email(email).cloned())
    }

    pub fn product(&self, id: ProductId) -> Result<Product, CacheError> {
        self.read(|c| c.product(id).cloned())
    }

    pub fn product_page(&self, page: usize) -> Result<Vec<ProductSummary>, CacheError> {
        self.read(|c| c.product_page(page))
    }

    pub fn product_detail(
        &self,
        id: ProductId,
        viewer: Option<UserId>,
    ) -> Result<ProductDetail, CacheError> {
        self.read(|c| c.product_detail(id, viewer))
    }

    pub fn purchase_history(&self, id: UserId) -> Result<PurchaseHistory, CacheError> {
        self.read(|c| c.purchase_history(id))
    }

    pub fn comments_for(&self, id: ProductId) -> Result<Vec<Comment>, CacheError> {
        self.read(|c| c.comments_for(id))
    }

    pub fn last5_comments_for(&self, id: ProductId) -> Result<Vec<Comment>, CacheError> {
        self.read(|c| c.last5_comments_for(id))
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Record a purchase in the live graph. No backing-store write happens.
    pub fn record_purchase(&self, buyer: UserId, product: ProductId) -> Result<History, CacheError> {
        let generation = self.generation();
        let history = {
            let mut catalog = generation.write();
            MutationApplier::record_purchase(&mut catalog, buyer, product, Utc::now())
        };
        match &history {
            Ok(h) => tracing::info!(
                history = %h.id,
                product = %product,
                user = %buyer,
                generation = generation.number(),
                "Buy success"
            ),
            Err(e) => tracing::warn!(product = %product, user = %buyer, error = %e, "Buy rejected"),
        }
        history
    }

    /// Post a comment in the live graph. No backing-store write happens.
    pub fn post_comment(
        &self,
        author: UserId,
        product: ProductId,
        content: impl Into<String>,
    ) -> Result<Comment, CacheError> {
        let generation = self.generation();
        let comment = {
            let mut catalog = generation.write();
            MutationApplier::post_comment(&mut catalog, author, product, content, Utc::now())
        };
        match &comment {
            Ok(c) => tracing::info!(
                comment = %c.id,
                product = %product,
                user = %author,
                generation = generation.number(),
                "Post comment success"
            ),
            Err(e) => {
                tracing::warn!(product = %product, user = %author, error = %e, "Comment rejected");
            }
        }
        comment
    }
}

// =============================================================================
// TESTS
// =============================================================================
