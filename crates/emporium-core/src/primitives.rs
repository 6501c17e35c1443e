//! # Cache Primitives
//!
//! Hardcoded display and maintenance constants for the Emporium cache.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Maximum characters kept in a product description preview.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 70;

/// Maximum characters kept in a comment content preview.
pub const COMMENT_PREVIEW_CHARS: usize = 25;

/// Marker appended to a truncated preview.
pub const ELLIPSIS: char = '…';

/// Length of the per-product "recent comments" view.
pub const RECENT_COMMENT_COUNT: usize = 5;

/// Products per page in the catalog listing.
pub const PRODUCT_PAGE_SIZE: usize = 50;

/// Maximum byte length of a posted comment.
///
/// Enforced at the API boundary before content reaches the cache.
pub const MAX_COMMENT_LENGTH: usize = 4096;

// =============================================================================
// RESET THRESHOLDS
// =============================================================================

/// Rows with an id above these thresholds are deleted by an administrative reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResetThresholds {
    pub users: u64,
    pub products: u64,
    pub comments: u64,
    pub histories: u64,
}

impl Default for ResetThresholds {
    fn default() -> Self {
        Self {
            users: 5_000,
            products: 10_000,
            comments: 200_000,
            histories: 500_000,
        }
    }
}
