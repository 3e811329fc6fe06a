//! # medicore
//!
//! Interactive shell for the MediCore portal. Reads one command per line
//! from stdin and prints each reply as JSON. Type `help` for the command
//! list.

use medicore_client::commands;
use medicore_client::config::ClientConfig;
use medicore_client::shell::{Reply, Shell, HELP};
use medicore_client::state::AppState;
use medicore_shared::constants::{APP_NAME, APP_TAGLINE};
use medicore_store::{Database, SessionStorage};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing and configuration
    // -----------------------------------------------------------------------
    medicore_client::init_tracing();
    info!("Starting {APP_NAME} portal v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 2. Storage and state
    // -----------------------------------------------------------------------
    let storage = SessionStorage::new(Box::new(open_database(&config)?));
    let state = AppState::new(config, storage)?.into_shared();

    match commands::auth::restore_session(&state).await {
        Ok(Some(user)) => info!(user = %user.id, role = %user.role, "Welcome back"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Could not restore session"),
    }

    // -----------------------------------------------------------------------
    // 3. Command loop
    // -----------------------------------------------------------------------
    println!("{APP_NAME}: {APP_TAGLINE}\n{HELP}");

    let shell = Shell::new(state);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match shell.execute(&line).await {
            Ok(Reply::Quit) => break,
            Ok(Reply::Json(value)) => value,
            Err(message) => json!({ "error": message }),
        };
        println!("{}", serde_json::to_string_pretty(&reply)?);
    }

    info!("Shell closed");
    Ok(())
}

/// The configured database file, the platform default, or an in-memory
/// fallback when neither can be opened.
fn open_database(config: &ClientConfig) -> anyhow::Result<Database> {
    let opened = match &config.db_path {
        Some(path) => Database::open_at(path),
        None => Database::new(),
    };

    match opened {
        Ok(db) => Ok(db),
        Err(e) => {
            warn!(error = %e, "Could not open database, sessions will not survive a restart");
            Ok(Database::open_in_memory()?)
        }
    }
}
