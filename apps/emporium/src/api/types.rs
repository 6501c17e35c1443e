//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API, and the
//! mapping from cache errors to HTTP status codes.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use emporium_core::{
    CacheError, CacheStats, Comment, CommentId, History, HistoryId, ProductId, ProductSummary,
    PurchaseEntry, PurchaseHistory, User, UserId, primitives::MAX_COMMENT_LENGTH,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Cache status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub generation: u64,
    pub users: usize,
    pub products: usize,
    pub comments: usize,
    pub histories: usize,
}

impl From<CacheStats> for StatusResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            generation: stats.generation,
            users: stats.users,
            products: stats.products,
            comments: stats.comments,
            histories: stats.histories,
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// `?page=N` on the listing; absent means the first page.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

/// One page of the product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPageResponse {
    pub page: usize,
    pub products: Vec<ProductSummary>,
}

/// A user's purchase history page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPageResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub purchases: Vec<PurchaseEntry>,
    pub total_pay: i64,
}

impl From<PurchaseHistory> for UserPageResponse {
    fn from(history: PurchaseHistory) -> Self {
        Self {
            user_id: history.user_id,
            user_name: history.user_name,
            purchases: history.entries,
            total_pay: history.total,
        }
    }
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The authenticated user, without the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Purchase confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub history_id: HistoryId,
    pub product_id: ProductId,
    pub user_id: UserId,
}

impl From<History> for PurchaseResponse {
    fn from(history: History) -> Self {
        Self {
            history_id: history.id,
            product_id: history.product_id,
            user_id: history.user_id,
        }
    }
}

/// Comment submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    /// Check the content before it reaches the cache.
    ///
    /// Content must be non-blank and at most `MAX_COMMENT_LENGTH` bytes.
    pub fn validate(&self) -> Result<&str, CacheError> {
        if self.content.trim().is_empty() {
            return Err(CacheError::InvalidInput(
                "Comment content must not be empty".to_string(),
            ));
        }
        if self.content.len() > MAX_COMMENT_LENGTH {
            return Err(CacheError::InvalidInput(format!(
                "Comment length {} exceeds maximum {} bytes",
                self.content.len(),
                MAX_COMMENT_LENGTH
            )));
        }
        Ok(&self.content)
    }
}

/// Posted comment confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub comment_id: CommentId,
    pub product_id: ProductId,
    pub content_preview: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            comment_id: comment.id,
            product_id: comment.product_id,
            content_preview: comment.content_preview,
        }
    }
}

/// Result of `POST /initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub generation: u64,
}

// =============================================================================
// ERRORS
// =============================================================================

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request: status code plus message.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl From<CacheError> for ApiError {
    fn from(error: CacheError) -> Self {
        let status = if error.is_not_found() {
            StatusCode::NOT_FOUND
        } else if matches!(error, CacheError::InvalidInput(_)) {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"emporium\""),
            );
        }
        response
    }
}
