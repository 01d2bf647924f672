//! services/client/src/error.rs
//!
//! Defines the primary error type for the entire `client` service.

use crate::config::ConfigError;
use budget_core::BudgetError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a typed outcome that propagated up from the client core.
    #[error("{0}")]
    Budget(#[from] BudgetError),

    /// Represents a standard Input/Output error (e.g., saving a report).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command-line input that clap's parser cannot catch on its own.
    #[error("{0}")]
    Usage(String),
}
