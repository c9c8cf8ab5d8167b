//! Custom error types and handling
//!
//! This module defines the application's error taxonomy. Boundary-specific
//! errors (metadata, evidence, sheet, ledger) live next to their sources and
//! convert into [`AppError`] at the service layer.

use crate::ledger::LedgerError;
use crate::sources::{MetadataError, SheetError};

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Resource errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Upstream errors that are worth retrying at the caller's discretion
    #[error("Transient fetch failure: {0}")]
    TransientFetch(String),

    // Caller errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Malformed window, empty problem list, bad settings - fatal for the run
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Ledger or sink unavailable - aborts the run with the ledger unmarked
    #[error("Persistence error: {0}")]
    Persistence(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Get the stable error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::TransientFetch(_) => "TRANSIENT_FETCH",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a fresh run for the same contest is safe and potentially useful
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, Self::TransientFetch(_) | Self::Persistence(_))
    }
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(slug) => {
                AppError::NotFound(format!("contest '{}' does not exist", slug))
            }
            MetadataError::Transient(msg) => AppError::TransientFetch(msg),
        }
    }
}

impl From<SheetError> for AppError {
    fn from(err: SheetError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
