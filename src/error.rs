//! Error types for the planner.

use thiserror::Error;

/// Result type for planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Top-level shape of an import document is not recognised
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid location at index {index}: {reason}")]
    InvalidLocation { index: usize, reason: String },

    #[error("Location name must not be empty")]
    EmptyName,

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),
}
