//! Error types for tradecore-core

use thiserror::Error;

/// Main error type for the tradecore-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Analysis API error
    #[error("analysis error: {0}")]
    Analysis(String),

    /// The analysis API key is not configured
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Market ticker error
    #[error("ticker error: {0}")]
    Ticker(String),

    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Template not found
    #[error("template not found: {0}")]
    TemplateNotFound(String),
}

/// Result type alias for tradecore-core
pub type Result<T> = std::result::Result<T, Error>;
