//! # Emporium CLI Module
//!
//! This module implements the command line interface.
//!
//! ## Available Commands
//!
//! - `server` - Load the cache and start the HTTP server (default)
//! - `status` - Load the cache and print entity counts
//! - `seed` - Write a JSON row dump into the redb store
//! - `reset` - Delete rows above the configured id thresholds

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use emporium_core::CacheError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Emporium - storefront server
///
/// Serves the catalog from an in-memory, fully linked cache of the
/// relational store.
#[derive(Parser, Debug)]
#[command(name = "emporium")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./emporium.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the redb database (overrides [store] path)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The banner goes to stdout, so JSON output suppresses it too.
    #[must_use]
    pub fn shows_banner(&self) -> bool {
        !self.quiet && !self.json_mode
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides [server] host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show cache status
    Status,

    /// Load rows from a JSON dump into the store
    Seed {
        /// Path to the JSON file ({"users": [...], "products": [...], ...})
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete rows above the reset thresholds
    Reset,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CacheError> {
    let (host, port) = match &cli.command {
        Some(Commands::Server { host, port }) => (host.clone(), *port),
        _ => (None, None),
    };
    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(cli.database, host, port);
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) | None => cmd_server(&config).await,
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Seed { file }) => cmd_seed(&config, json_mode, &file),
        Some(Commands::Reset) => cmd_reset(&config, json_mode),
    }
}
