//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::AppConfig;
use emporium_core::{BackingStore, Cache, CacheError, CacheStats, Catalog, RedbStore, TableRows};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum seed file size (500 MB).
const MAX_SEED_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Canonicalize `path` and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CacheError> {
    let canonical = path.canonicalize().map_err(|e| {
        CacheError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CacheError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CacheError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CacheError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CacheError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Load the cache and serve until shutdown.
pub async fn cmd_server(config: &AppConfig) -> Result<(), CacheError> {
    let cache = Arc::new(load_cache(config)?);
    let stats = cache.stats();

    println!("Emporium Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_addr());
    println!("  Database: {:?}", config.store.path);
    println!();
    println!("Cache:");
    print_stats(&stats);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(cache, config.store.reset);
    api::run_server(&config.bind_addr(), state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Load the cache and report what it holds.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), CacheError> {
    let stats = load_cache(config)?.stats();

    if json_mode {
        let output = serde_json::json!({
            "database": config.store.path.to_string_lossy(),
            "generation": stats.generation,
            "users": stats.users,
            "products": stats.products,
            "comments": stats.comments,
            "histories": stats.histories,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Emporium Cache Status");
    println!("=====================");
    println!("Database: {:?}", config.store.path);
    println!();
    print_stats(&stats);

    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Write a JSON row dump into the store.
///
/// Rows with an existing id are overwritten. The dump is merged with the
/// stored rows and linked before anything is written, so a dump with
/// dangling references leaves the store untouched.
pub fn cmd_seed(config: &AppConfig, json_mode: bool, file: &Path) -> Result<(), CacheError> {
    tracing::info!("Seeding from {:?}", file);

    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_SEED_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| CacheError::IoError(format!("Read file: {}", e)))?;
    let rows: TableRows = serde_json::from_slice(&contents)
        .map_err(|e| CacheError::SerializationError(format!("Invalid seed file: {}", e)))?;

    let store = RedbStore::open(&config.store.path)?;
    Catalog::build(merge_rows(store.fetch_all()?, &rows))?;
    let written = store.insert_rows(&rows)?;
    let stats = Cache::load(Arc::new(store))?.stats();

    if json_mode {
        let output = serde_json::json!({
            "written": written,
            "users": stats.users,
            "products": stats.products,
            "comments": stats.comments,
            "histories": stats.histories,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Seeded {} rows", written);
        print_stats(&stats);
    }

    Ok(())
}

/// Stored rows overlaid with `incoming`, each table ascending by id.
fn merge_rows(stored: TableRows, incoming: &TableRows) -> TableRows {
    fn overlay<T: Clone>(stored: Vec<T>, incoming: &[T], id: impl Fn(&T) -> u64) -> Vec<T> {
        let mut rows: BTreeMap<u64, T> = stored.into_iter().map(|r| (id(&r), r)).collect();
        rows.extend(incoming.iter().map(|r| (id(r), r.clone())));
        rows.into_values().collect()
    }

    TableRows {
        users: overlay(stored.users, &incoming.users, |r| r.id.0),
        products: overlay(stored.products, &incoming.products, |r| r.id.0),
        comments: overlay(stored.comments, &incoming.comments, |r| r.id.0),
        histories: overlay(stored.histories, &incoming.histories, |r| r.id.0),
    }
}

// =============================================================================
// RESET COMMAND
// =============================================================================

/// Delete rows above the configured thresholds.
pub fn cmd_reset(config: &AppConfig, json_mode: bool) -> Result<(), CacheError> {
    let store = RedbStore::open(&config.store.path)?;
    store.reset(&config.store.reset)?;
    let remaining = store.fetch_all()?;

    if json_mode {
        let output = serde_json::json!({
            "thresholds": config.store.reset,
            "users": remaining.users.len(),
            "products": remaining.products.len(),
            "comments": remaining.comments.len(),
            "histories": remaining.histories.len(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Reset {:?}", config.store.path);
        println!("Users:     {}", remaining.users.len());
        println!("Products:  {}", remaining.products.len());
        println!("Comments:  {}", remaining.comments.len());
        println!("Histories: {}", remaining.histories.len());
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured store and perform the initial load.
pub fn load_cache(config: &AppConfig) -> Result<Cache, CacheError> {
    let store = RedbStore::open(&config.store.path)?;
    Cache::load(Arc::new(store))
}

fn print_stats(stats: &CacheStats) {
    println!("Generation: {}", stats.generation);
    println!("Users:      {}", stats.users);
    println!("Products:   {}", stats.products);
    println!("Comments:   {}", stats.comments);
    println!("Histories:  {}", stats.histories);
}

// =============================================================================
// TESTS
// =============================================================================
