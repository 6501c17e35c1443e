//! # API Endpoint Handlers
//!
//! Every read is served from the cache; the only handler that touches the
//! backing store is `initialize`.

use super::{
    AppState,
    auth::{CurrentUser, verify_credentials},
    types::{
        ApiError, CommentRequest, CommentResponse, HealthResponse, InitializeResponse,
        LoginRequest, PageQuery, ProductPageResponse, PurchaseResponse, StatusResponse,
        UserPageResponse, UserSummary,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use emporium_core::{CacheError, ProductDetail, ProductId, UserId};

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Entity counts and generation of the published cache.
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.cache.stats().into())
}

// =============================================================================
// CATALOG
// =============================================================================

/// Product listing, `GET /` and `GET /products?page=N`.
pub async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProductPageResponse>, ApiError> {
    let page = query.page.unwrap_or(0);
    let products = state.cache.product_page(page)?;
    Ok(Json(ProductPageResponse { page, products }))
}

/// Product page with every comment.
pub async fn product_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    viewer: Option<CurrentUser>,
) -> Result<Json<ProductDetail>, ApiError> {
    let detail = state
        .cache
        .product_detail(ProductId(id), viewer.map(|user| user.id))?;
    Ok(Json(detail))
}

/// Purchase history of one user.
pub async fn user_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<UserPageResponse>, ApiError> {
    let history = state.cache.purchase_history(UserId(id))?;
    Ok(Json(history.into()))
}

// =============================================================================
// LOGIN
// =============================================================================

pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = verify_credentials(&state, &request.email, &request.password)
        .ok_or_else(ApiError::unauthorized)?;
    tracing::info!(user = %user.id, "Login success");
    Ok(Json(UserSummary::from(&user)))
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Record a purchase by the authenticated user.
pub async fn buy_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    user: CurrentUser,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let history = state.cache.record_purchase(user.id, ProductId(id))?;
    Ok(Json(history.into()))
}

/// Post a comment as the authenticated user.
pub async fn comment_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    user: CurrentUser,
    Json(request): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let content = request.validate()?;
    let comment = state.cache.post_comment(user.id, ProductId(id), content)?;
    Ok(Json(comment.into()))
}

// =============================================================================
// INITIALIZE
// =============================================================================

/// Reset the backing store and reload the cache.
///
/// A failed reload leaves the server unable to trust its cache: the
/// request answers 500 and the server is told to shut down.
pub async fn initialize_handler(
    State(state): State<AppState>,
) -> Result<Json<InitializeResponse>, ApiError> {
    let cache = state.cache.clone();
    let thresholds = state.thresholds;
    // A panicked task may have reset the store without reloading.
    let outcome = tokio::task::spawn_blocking(move || cache.reset_and_reload(&thresholds))
        .await
        .unwrap_or_else(|e| Err(CacheError::LoadFailure(format!("Initialize task failed: {}", e))));

    match outcome {
        Ok(generation) => Ok(Json(InitializeResponse { generation })),
        Err(e) => {
            tracing::error!(error = %e, "Initialize failed, shutting down");
            state.shutdown.trip();
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ))
        }
    }
}
