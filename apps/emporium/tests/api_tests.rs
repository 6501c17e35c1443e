//! Integration tests for the Emporium HTTP API.
//!
//! Uses axum-test to drive the router over an in-memory store without
//! starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use emporium::api::{
    AppState, CommentResponse, ErrorResponse, HealthResponse, InitializeResponse,
    ProductPageResponse, PurchaseResponse, StatusResponse, UserPageResponse, UserSummary,
    create_router,
};
use emporium_core::{
    BackingStore, Cache, CacheError, CommentId, CommentRow, HistoryId, HistoryRow, MemoryStore, ProductDetail, ProductId,
    ProductRow, ResetThresholds, TableRows, UserId, UserRow,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Mutex to serialize tests since the router reads env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Three users, 60 products (price = id * 100), seven comments on product
/// 10 and one purchase of product 11 by user 3.
fn storefront() -> TableRows {
    TableRows {
        users: (1..=3)
            .map(|id| UserRow {
                id: UserId(id),
                name: format!("user{id}"),
                email: format!("u{id}@x.com"),
                password: format!("secret{id}"),
                last_login: at(0),
            })
            .collect(),
        products: (1..=60)
            .map(|id| ProductRow {
                id: ProductId(id),
                name: format!("product{id}"),
                description: "d".repeat(80),
                image_path: format!("/images/{id}.jpg"),
                price: id as i64 * 100,
                created_at: at(0),
            })
            .collect(),
        comments: (1..=7)
            .map(|id| CommentRow {
                id: CommentId(id),
                product_id: ProductId(10),
                user_id: UserId(1),
                content: format!("comment {id}"),
                created_at: at(id as i64),
            })
            .collect(),
        histories: vec![HistoryRow {
            id: HistoryId(1),
            product_id: ProductId(11),
            user_id: UserId(3),
            created_at: at(1),
        }],
    }
}

struct Fixture {
    server: TestServer,
    state: AppState,
    store: Arc<MemoryStore>,
    _guard: std::sync::MutexGuard<'static, ()>,
}

fn fixture_with(thresholds: ResetThresholds) -> Fixture {
    let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::remove_var("EMPORIUM_RATE_LIMIT");
        std::env::remove_var("EMPORIUM_CORS_ORIGINS");
    }

    let store = Arc::new(MemoryStore::new(storefront()));
    let cache = Arc::new(Cache::load(store.clone()).unwrap());
    let state = AppState::new(cache, thresholds);
    let server = TestServer::new(create_router(state.clone())).unwrap();
    Fixture {
        server,
        state,
        store,
        _guard: guard,
    }
}

fn fixture() -> Fixture {
    fixture_with(ResetThresholds::default())
}

fn basic(email: &str, password: &str) -> HeaderValue {
    let encoded = STANDARD.encode(format!("{email}:{password}"));
    format!("Basic {encoded}").parse().unwrap()
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let f = fixture();

    let response = f.server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_reports_counts() {
    let f = fixture();

    let status: StatusResponse = f.server.get("/status").await.json();

    assert_eq!(status.generation, 1);
    assert_eq!(status.users, 3);
    assert_eq!(status.products, 60);
    assert_eq!(status.comments, 7);
    assert_eq!(status.histories, 1);
}

// =============================================================================
// CATALOG
// =============================================================================

#[tokio::test]
async fn test_index_lists_newest_first() {
    let f = fixture();

    let response = f.server.get("/").await;

    response.assert_status_ok();
    let page: ProductPageResponse = response.json();
    assert_eq!(page.page, 0);
    assert_eq!(page.products.len(), 50);
    assert_eq!(page.products[0].id, ProductId(60));
    assert_eq!(page.products[49].id, ProductId(11));
    assert!(page.products[0].description_preview.ends_with('…'));
}

#[tokio::test]
async fn test_second_page() {
    let f = fixture();

    let page: ProductPageResponse = f
        .server
        .get("/products")
        .add_query_param("page", 1)
        .await
        .json();

    assert_eq!(page.page, 1);
    assert_eq!(page.products.len(), 10);
    let ten = page
        .products
        .iter()
        .find(|p| p.id == ProductId(10))
        .unwrap();
    assert_eq!(ten.comment_count, 7);
    let recent: Vec<CommentId> = ten.recent_comments.iter().map(|c| c.id).collect();
    assert_eq!(
        recent,
        vec![CommentId(7), CommentId(6), CommentId(5), CommentId(4), CommentId(3)]
    );
}

#[tokio::test]
async fn test_product_detail() {
    let f = fixture();

    let response = f.server.get("/products/10").await;

    response.assert_status_ok();
    let detail: ProductDetail = response.json();
    assert_eq!(detail.comments.len(), 7);
    assert_eq!(detail.comments[0].user_name, "user1");
    assert!(!detail.already_bought);
}

#[tokio::test]
async fn test_product_detail_marks_bought_for_viewer() {
    let f = fixture();

    let detail: ProductDetail = f
        .server
        .get("/products/11")
        .add_header(header::AUTHORIZATION, basic("u3@x.com", "secret3"))
        .await
        .json();

    assert!(detail.already_bought);
}

#[tokio::test]
async fn test_unknown_product_is_404() {
    let f = fixture();

    let response = f.server.get("/products/999").await;

    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("999"));
}

#[tokio::test]
async fn test_user_page_totals_purchases() {
    let f = fixture();

    let page: UserPageResponse = f.server.get("/users/3").await.json();

    assert_eq!(page.user_name, "user3");
    assert_eq!(page.purchases.len(), 1);
    assert_eq!(page.total_pay, 1100);
}

#[tokio::test]
async fn test_unknown_user_is_404() {
    let f = fixture();
    f.server.get("/users/42").await.assert_status_not_found();
}

// =============================================================================
// LOGIN
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let f = fixture();

    let response = f
        .server
        .post("/login")
        .json(&json!({"email": "u1@x.com", "password": "secret1"}))
        .await;

    response.assert_status_ok();
    let user: UserSummary = response.json();
    assert_eq!(user.id, UserId(1));
    assert_eq!(user.name, "user1");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let f = fixture();

    let response = f
        .server
        .post("/login")
        .json(&json!({"email": "u1@x.com", "password": "secret2"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_unknown_email() {
    let f = fixture();

    let response = f
        .server
        .post("/login")
        .json(&json!({"email": "nope@x.com", "password": "secret1"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// BUY
// =============================================================================

#[tokio::test]
async fn test_buy_requires_auth() {
    let f = fixture();

    let response = f.server.post("/products/buy/10").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(f.state.cache.stats().histories, 1);
}

#[tokio::test]
async fn test_buy_with_bad_password() {
    let f = fixture();

    let response = f
        .server
        .post("/products/buy/10")
        .add_header(header::AUTHORIZATION, basic("u3@x.com", "wrong"))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_buy_records_purchase() {
    let f = fixture();

    let response = f
        .server
        .post("/products/buy/10")
        .add_header(header::AUTHORIZATION, basic("u3@x.com", "secret3"))
        .await;

    response.assert_status_ok();
    let purchase: PurchaseResponse = response.json();
    assert_eq!(purchase.history_id, HistoryId(2));
    assert_eq!(purchase.product_id, ProductId(10));
    assert_eq!(purchase.user_id, UserId(3));

    let page: UserPageResponse = f.server.get("/users/3").await.json();
    assert_eq!(page.total_pay, 1100 + 1000);
    assert_eq!(page.purchases[0].product_id, ProductId(10));
}

#[tokio::test]
async fn test_buy_unknown_product_is_404() {
    let f = fixture();

    let response = f
        .server
        .post("/products/buy/999")
        .add_header(header::AUTHORIZATION, basic("u3@x.com", "secret3"))
        .await;

    response.assert_status_not_found();
    assert_eq!(f.state.cache.stats().histories, 1);
}

// =============================================================================
// COMMENT
// =============================================================================

#[tokio::test]
async fn test_comment_posts_and_updates_recent() {
    let f = fixture();

    let response = f
        .server
        .post("/comments/10")
        .add_header(header::AUTHORIZATION, basic("u3@x.com", "secret3"))
        .json(&json!({"content": "x".repeat(30)}))
        .await;

    response.assert_status_ok();
    let comment: CommentResponse = response.json();
    assert_eq!(comment.comment_id, CommentId(8));
    assert_eq!(comment.content_preview, format!("{}…", "x".repeat(25)));

    let detail: ProductDetail = f.server.get("/products/10").await.json();
    assert_eq!(detail.comments.len(), 8);
    assert_eq!(detail.comments[7].user_name, "user3");
}

#[tokio::test]
async fn test_comment_empty_is_400() {
    let f = fixture();

    let response = f
        .server
        .post("/comments/10")
        .add_header(header::AUTHORIZATION, basic("u1@x.com", "secret1"))
        .json(&json!({"content": "   "}))
        .await;

    response.assert_status_bad_request();
    assert_eq!(f.state.cache.stats().comments, 7);
}

#[tokio::test]
async fn test_comment_too_long_is_400() {
    let f = fixture();

    let response = f
        .server
        .post("/comments/10")
        .add_header(header::AUTHORIZATION, basic("u1@x.com", "secret1"))
        .json(&json!({"content": "y".repeat(4097)}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_comment_requires_auth() {
    let f = fixture();

    let response = f
        .server
        .post("/comments/10")
        .json(&json!({"content": "hello"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// INITIALIZE
// =============================================================================

#[tokio::test]
async fn test_initialize_truncates_and_reloads() {
    let f = fixture_with(ResetThresholds {
        products: 20,
        ..ResetThresholds::default()
    });

    // An unpersisted purchase disappears with the reload.
    f.server
        .post("/products/buy/10")
        .add_header(header::AUTHORIZATION, basic("u1@x.com", "secret1"))
        .await
        .assert_status_ok();

    let response = f.server.post("/initialize").await;

    response.assert_status_ok();
    let init: InitializeResponse = response.json();
    assert_eq!(init.generation, 2);

    let status: StatusResponse = f.server.get("/status").await.json();
    assert_eq!(status.products, 20);
    assert_eq!(status.histories, 1);
    assert!(!f.state.shutdown.is_tripped());
}

#[tokio::test]
async fn test_initialize_failure_trips_shutdown() {
    let f = fixture();
    f.store.set_failing(true);

    let response = f.server.post("/initialize").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(f.state.shutdown.is_tripped());

    // The previous generation keeps answering until the server stops.
    let status: StatusResponse = f.server.get("/status").await.json();
    assert_eq!(status.generation, 1);
}

/// Reads like a `MemoryStore`; panics on reset.
struct PanickingResetStore(MemoryStore);

impl BackingStore for PanickingResetStore {
    fn fetch_users(&self) -> Result<Vec<UserRow>, CacheError> {
        self.0.fetch_users()
    }

    fn fetch_products(&self) -> Result<Vec<ProductRow>, CacheError> {
        self.0.fetch_products()
    }

    fn fetch_comments(&self) -> Result<Vec<CommentRow>, CacheError> {
        self.0.fetch_comments()
    }

    fn fetch_histories(&self) -> Result<Vec<HistoryRow>, CacheError> {
        self.0.fetch_histories()
    }

    fn reset(&self, _thresholds: &ResetThresholds) -> Result<(), CacheError> {
        panic!("reset interrupted");
    }
}

#[tokio::test]
async fn test_initialize_panic_trips_shutdown() {
    let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::remove_var("EMPORIUM_RATE_LIMIT");
        std::env::remove_var("EMPORIUM_CORS_ORIGINS");
    }

    let store = Arc::new(PanickingResetStore(MemoryStore::new(storefront())));
    let cache = Arc::new(Cache::load(store).unwrap());
    let state = AppState::new(cache, ResetThresholds::default());
    let server = TestServer::new(create_router(state.clone())).unwrap();

    let response = server.post("/initialize").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("Initialize task failed"));
    assert!(state.shutdown.is_tripped());
}

// =============================================================================
// MIDDLEWARE / ERRORS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_excess() {
    let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("EMPORIUM_RATE_LIMIT", "1") };

    let cache = Arc::new(Cache::load(Arc::new(MemoryStore::new(storefront()))).unwrap());
    let server =
        TestServer::new(create_router(AppState::new(cache, ResetThresholds::default()))).unwrap();

    server.get("/health").await.assert_status_ok();
    let second = server.get("/health").await;

    // SAFETY: as above.
    unsafe { std::env::remove_var("EMPORIUM_RATE_LIMIT") };
    drop(guard);

    assert_eq!(second.status_code(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let f = fixture();
    f.server.get("/unknown").await.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let f = fixture();

    // /health is GET only
    let response = f.server.post("/health").await;
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let f = fixture();

    let response = f
        .server
        .post("/login")
        .text("not valid json")
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}
