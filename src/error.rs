// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Taxis

use thiserror::Error;

/// Result type alias for Taxis operations
pub type Result<T> = std::result::Result<T, TaxisError>;

/// Taxis error types
#[derive(Error, Debug)]
pub enum TaxisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error(
        "Capacity exceeded for '{owner}': {used_bytes} bytes used + {requested_bytes} requested > {limit_bytes} limit"
    )]
    CapacityExceeded {
        owner: String,
        used_bytes: u64,
        requested_bytes: u64,
        limit_bytes: u64,
    },

    #[error("Invalid label or path component: {0}")]
    InvalidLabel(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl TaxisError {
    /// True for quota rejections, which are recoverable and leave no state behind
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, TaxisError::CapacityExceeded { .. })
    }
}
