//! # Emporium
//!
//! Library half of the storefront binary: the HTTP API, the CLI commands
//! and configuration loading. `main.rs` only installs logging and hands
//! the parsed command line to [`cli::execute`].

pub mod api;
pub mod cli;
pub mod config;
