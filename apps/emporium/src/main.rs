//! # Emporium - Storefront Server
//!
//! The main binary for the Emporium catalog cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │               apps/emporium (THE BINARY)              │
//! │                                                       │
//! │   ┌─────────────┐        ┌─────────────┐              │
//! │   │    CLI      │        │  HTTP API   │              │
//! │   │   (clap)    │        │   (axum)    │              │
//! │   └──────┬──────┘        └──────┬──────┘              │
//! │          └───────────┬──────────┘                     │
//! │                      ▼                                │
//! │              ┌───────────────┐     ┌──────────────┐   │
//! │              │ emporium-core │◄────│  redb store  │   │
//! │              │  (THE CACHE)  │     └──────────────┘   │
//! │              └───────────────┘                        │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Seed the store and start the HTTP server
//! emporium seed -f rows.json
//! emporium server --host 0.0.0.0 --port 8080
//!
//! # Maintenance
//! emporium status --json-mode
//! emporium reset
//! ```

use clap::Parser;
use emporium::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // EMPORIUM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("EMPORIUM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "emporium=info,emporium_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if cli.shows_banner() {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ███████╗███╗   ███╗██████╗  ██████╗ ██████╗ ██╗██╗   ██╗███╗   ███╗
  ██╔════╝████╗ ████║██╔══██╗██╔═══██╗██╔══██╗██║██║   ██║████╗ ████║
  █████╗  ██╔████╔██║██████╔╝██║   ██║██████╔╝██║██║   ██║██╔████╔██║
  ██╔══╝  ██║╚██╔╝██║██╔═══╝ ██║   ██║██╔══██╗██║██║   ██║██║╚██╔╝██║
  ███████╗██║ ╚═╝ ██║██║     ╚██████╔╝██║  ██║██║╚██████╔╝██║ ╚═╝ ██║
  ╚══════╝╚═╝     ╚═╝╚═╝      ╚═════╝ ╚═╝  ╚═╝╚═╝ ╚═════╝ ╚═╝     ╚═╝

  Storefront Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
