//! Database layer for tradecore
//!
//! This module provides the persistent key/value backend using SQLite with:
//! - Schema migrations
//! - Whole-value reads and overwrites per key

pub mod repo;
pub mod schema;

pub use repo::Database;
