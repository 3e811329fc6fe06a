//! # medicore-client
//!
//! Portal front end: the session manager, page routing, and the command
//! handlers that drive authentication and telemedicine consultations. The
//! `medicore` binary exposes the commands through a line-oriented shell.

pub mod auth;
pub mod commands;
pub mod config;
pub mod directory;
pub mod pages;
pub mod shell;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("medicore_client=debug,medicore_media=info,medicore_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
