//! # tradecore-core
//!
//! Core library for tradecore, a market-analysis chat client.
//!
//! This library provides:
//! - Domain types for sessions, templates and settings
//! - An obfuscated key/value store backed by SQLite
//! - Session lifecycle management and JSON export
//! - The chat turn orchestrator and its analysis client
//! - Chart block parsing and the market ticker
//! - Configuration and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use tradecore_core::{Config, SecureStore, SessionManager};
//!
//! let config = Config::load().expect("failed to load config");
//! let store = SecureStore::open(&Config::database_path()).expect("failed to open store");
//! let manager = SessionManager::load(store);
//!
//! for session in manager.history() {
//!     println!("{} {}", session.id, session.title);
//! }
//! # let _ = config;
//! ```

// Re-export commonly used items at the crate root
pub use chat::{ChatView, TurnOutcome, TurnState};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use session::SessionManager;
pub use storage::SecureStore;
pub use types::*;

// Public modules
pub mod analysis;
pub mod chart;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod format;
pub mod logging;
pub mod prompt;
pub mod session;
pub mod storage;
pub mod ticker;
pub mod types;
