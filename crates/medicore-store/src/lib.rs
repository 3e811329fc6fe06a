//! # medicore-store
//!
//! Local persistence for the MediCore portal: a SQLite-backed durable tier,
//! an in-memory session tier, and [`SessionStorage`], which keeps the
//! `{token, user}` pair in whichever tier the login asked for.

pub mod database;
pub mod kv;
pub mod migrations;
pub mod session_storage;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use kv::{KeyValueStore, MemoryStore};
pub use session_storage::{SessionStorage, StorageTier, StoredSession};
