//! crates/budget_core/src/error.rs
//!
//! The typed outcome every core operation resolves to. The presentation
//! layer maps these onto user-visible messages; nothing here is fatal to
//! the process.

use crate::ports::{BackendError, StoreError};

/// The client core's error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// Rejected client-side before any backend call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No valid session: wrong credentials, expired token, or not logged in.
    /// Outside the login flow this always comes with a forced logout.
    #[error("authentication required")]
    Auth,

    /// The request never completed; previous state is retained and the
    /// operation may be retried.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected the request; the message is surfaced verbatim
    /// where the backend provided one.
    #[error("server error: {0}")]
    Server(String),

    /// Another mutation against the same logical resource is still in
    /// flight; the caller may retry once it settles.
    #[error("a change to {0} is already in flight")]
    Busy(String),

    /// An identity storage tier failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, BudgetError>`.
pub type BudgetResult<T> = Result<T, BudgetError>;

impl From<BackendError> for BudgetError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized => BudgetError::Auth,
            BackendError::Network(msg) => BudgetError::Network(msg),
            BackendError::Server(msg) => BudgetError::Server(msg),
        }
    }
}

impl From<StoreError> for BudgetError {
    fn from(err: StoreError) -> Self {
        BudgetError::Storage(err.to_string())
    }
}
