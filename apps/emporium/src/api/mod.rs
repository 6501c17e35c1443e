//! # Emporium HTTP API Module
//!
//! This module implements the storefront JSON API using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Cache entity counts and generation
//! - `GET /`, `GET /products?page=N` - Product listing, newest first
//! - `GET /products/{id}` - Product detail with comments
//! - `GET /users/{id}` - Purchase history with `total_pay`
//! - `POST /login` - Check `{email, password}`
//! - `POST /products/buy/{id}` - Buy a product (auth)
//! - `POST /comments/{id}` - Comment on a product (auth)
//! - `POST /initialize` - Reset the backing store and reload the cache
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `EMPORIUM_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `EMPORIUM_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{CurrentUser, parse_basic_credentials, secrets_match, verify_credentials};
pub use middleware::{
    DEFAULT_RATE_LIMIT, GlobalRateLimiter, create_rate_limiter, get_rate_limit_from_env,
};
pub use types::{
    ApiError, CommentRequest, CommentResponse, ErrorResponse, HealthResponse, InitializeResponse,
    LoginRequest, PageQuery, ProductPageResponse, PurchaseResponse, StatusResponse,
    UserPageResponse, UserSummary,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use emporium_core::{Cache, CacheError, ResetThresholds};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body cap; comment bodies are the largest legitimate payload.
const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Tripped when the cache can no longer be trusted; stops the server.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    tripped: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Resolves once `trip` has been called.
    pub async fn tripped(&self) {
        if !self.is_tripped() {
            self.notify.notified().await;
        }
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Cache>,
    /// Thresholds for `POST /initialize`.
    pub thresholds: ResetThresholds,
    pub shutdown: Arc<ShutdownSignal>,
}

impl AppState {
    #[must_use]
    pub fn new(cache: Arc<Cache>, thresholds: ResetThresholds) -> Self {
        Self {
            cache,
            thresholds,
            shutdown: Arc::new(ShutdownSignal::default()),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `EMPORIUM_CORS_ORIGINS`.
///
/// - `*`: allows all origins
/// - unset, or no valid entry: localhost only
/// - otherwise: the comma-separated origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("EMPORIUM_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (EMPORIUM_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in EMPORIUM_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                cors_for(allowed_origins)
            }
        }
        None => build_localhost_cors(),
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();
    cors_for(origins)
}

fn cors_for(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/", get(handlers::index_handler))
        .route("/products", get(handlers::index_handler))
        .route("/products/{id}", get(handlers::product_handler))
        .route("/products/buy/{id}", post(handlers::buy_handler))
        .route("/comments/{id}", post(handlers::comment_handler))
        .route("/users/{id}", get(handlers::user_handler))
        .route("/login", post(handlers::login_handler))
        .route("/initialize", post(handlers::initialize_handler));

    if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until Ctrl+C or until the cache becomes untrustworthy.
///
/// Returns an error in the second case so the process exits non-zero.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), CacheError> {
    let shutdown = Arc::clone(&state.shutdown);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CacheError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Emporium HTTP server listening on {}", addr);

    let signal = Arc::clone(&shutdown);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl+C, shutting down"),
                () = signal.tripped() => {}
            }
        })
        .await
        .map_err(|e| CacheError::IoError(format!("Server error: {}", e)))?;

    if shutdown.is_tripped() {
        return Err(CacheError::LoadFailure(
            "cache reload failed; server stopped".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trip_before_wait_still_resolves() {
        let signal = ShutdownSignal::default();
        assert!(!signal.is_tripped());
        signal.trip();
        signal.tripped().await;
        assert!(signal.is_tripped());
    }

    #[tokio::test]
    async fn trip_wakes_a_waiter() {
        let signal = Arc::new(ShutdownSignal::default());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.tripped().await })
        };
        tokio::task::yield_now().await;
        signal.trip();
        waiter.await.expect("waiter");
    }
}
