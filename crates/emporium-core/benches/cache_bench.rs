//! # Cache Benchmarks
//!
//! Performance benchmarks for emporium-core load and request paths.
//!
//! Run with: `cargo bench -p emporium-core`

use chrono::{DateTime, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use emporium_core::{
    Cache, Catalog, CommentId, CommentRow, HistoryId, HistoryRow, MemoryStore, MutationApplier,
    ProductId, ProductRow, TableRows, UserId, UserRow,
};
use std::hint::black_box;
use std::sync::Arc;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// A storefront with `products` products, 100 users, and ten comments and
/// ten purchases per product spread round-robin over the users.
fn storefront(products: u64) -> TableRows {
    let users = 100;
    let per_product = 10;
    TableRows {
        users: (1..=users)
            .map(|id| UserRow {
                id: UserId(id),
                name: format!("user{id}"),
                email: format!("user{id}@example.com"),
                password: format!("password{id}"),
                last_login: at(0),
            })
            .collect(),
        products: (1..=products)
            .map(|id| ProductRow {
                id: ProductId(id),
                name: format!("product{id}"),
                description: "A fairly long product description. ".repeat(4),
                image_path: format!("/images/image{id}.jpg"),
                price: (id % 97 + 1) as i64 * 100,
                created_at: at(0),
            })
            .collect(),
        comments: (1..=products * per_product)
            .map(|id| CommentRow {
                id: CommentId(id),
                product_id: ProductId((id - 1) / per_product + 1),
                user_id: UserId(id % users + 1),
                content: "Great product, would buy again. Arrived quickly.".to_string(),
                created_at: at(id as i64),
            })
            .collect(),
        histories: (1..=products * per_product)
            .map(|id| HistoryRow {
                id: HistoryId(id),
                product_id: ProductId((id - 1) / per_product + 1),
                user_id: UserId(id % users + 1),
                created_at: at(id as i64),
            })
            .collect(),
    }
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_catalog_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_build");

    for size in [100, 1000, 5000].iter() {
        let rows = storefront(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| black_box(Catalog::build(rows.clone())));
        });
    }

    group.finish();
}

fn bench_reload(c: &mut Criterion) {
    let mut group = c.benchmark_group("reload");

    for size in [100, 1000].iter() {
        let store = Arc::new(MemoryStore::new(storefront(*size)));
        let Ok(cache) = Cache::load(store) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(cache.reload()));
        });
    }

    group.finish();
}

fn bench_post_comment(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_comment");

    for size in [100, 1000].iter() {
        let Ok(catalog) = Catalog::build(storefront(*size)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut catalog = catalog.clone();
            let mut i = 0u64;
            b.iter(|| {
                i = i.wrapping_add(1);
                let product = ProductId(i % size + 1);
                black_box(MutationApplier::post_comment(
                    &mut catalog,
                    UserId(i % 100 + 1),
                    product,
                    "benchmark comment body",
                    at(0),
                ))
            });
        });
    }

    group.finish();
}

fn bench_product_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("product_page");

    for size in [1000, 5000].iter() {
        let Ok(catalog) = Catalog::build(storefront(*size)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(catalog.product_page(black_box(3))));
        });
    }

    group.finish();
}

fn bench_purchase_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("purchase_history");

    for size in [1000, 5000].iter() {
        let Ok(catalog) = Catalog::build(storefront(*size)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(catalog.purchase_history(UserId(42))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_catalog_build,
    bench_reload,
    bench_post_comment,
    bench_product_page,
    bench_purchase_history,
);

criterion_main!(benches);
