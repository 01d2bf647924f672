//! crates/budget_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the client core.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete REST transport and of whatever the
//! host platform uses for durable and ephemeral identity storage.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::domain::{
    BudgetSnapshot, ExpenseId, ExpensePatch, ExpenseRecord, Money, MonthlyTrend, NewExpense,
    ReportFormat, StoredIdentity, TrendsSummary,
};

//=========================================================================================
// Backend Port Error and Result Types
//=========================================================================================

/// An error reported by the backend collaborator.
///
/// The three variants are the transport-level legs of the client's error
/// taxonomy: authorization failure, request that never completed, and a
/// completed request the server rejected.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// 401 / invalid credentials / expired token.
    #[error("authorization failed")]
    Unauthorized,
    /// The request could not complete (connect, timeout, DNS).
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx with a server-supplied message where available.
    #[error("{0}")]
    Server(String),
}

/// A convenience type alias for `Result<T, BackendError>`.
pub type BackendResult<T> = Result<T, BackendError>;

/// An error from an identity storage tier.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage i/o failed: {0}")]
    Io(String),
    #[error("stored identity is unreadable: {0}")]
    Corrupt(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Tokens returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// The REST backend collaborator, as the client core sees it.
///
/// Implementations own the wire format; everything crossing this boundary is
/// already in canonical domain shape.
#[async_trait]
pub trait BudgetBackend: Send + Sync {
    // --- Auth ---
    async fn register(&self, email: &str, password: &str) -> BackendResult<()>;

    async fn login(&self, email: &str, password: &str) -> BackendResult<LoginTokens>;

    /// Fetches salary, budget limit and the full expense collection.
    async fn fetch_profile(&self, email: &str) -> BackendResult<BudgetSnapshot>;

    // --- Budget mutations ---
    async fn add_expense(&self, email: &str, expense: &NewExpense) -> BackendResult<ExpenseRecord>;

    async fn update_expense(
        &self,
        id: &ExpenseId,
        patch: &ExpensePatch,
    ) -> BackendResult<ExpenseRecord>;

    async fn delete_expense(&self, id: &ExpenseId) -> BackendResult<()>;

    async fn set_salary(&self, email: &str, amount: Money) -> BackendResult<()>;

    async fn set_budget(&self, email: &str, amount: Money) -> BackendResult<()>;

    /// Clears salary, budget and every expense for the account.
    async fn reset_all(&self, email: &str) -> BackendResult<()>;

    // --- Trends and reports ---
    async fn monthly_trends(&self, email: &str) -> BackendResult<Vec<MonthlyTrend>>;

    async fn trends_summary(&self, email: &str) -> BackendResult<TrendsSummary>;

    /// Downloads a rendered report as an opaque blob; the caller decides
    /// where to save it.
    async fn download_report(&self, email: &str, format: ReportFormat) -> BackendResult<Vec<u8>>;
}

/// One identity storage tier (durable or ephemeral), injected into the
/// session store so tests never need a real storage backend.
pub trait IdentityStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredIdentity>, StoreError>;

    fn save(&self, identity: &StoredIdentity) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

//=========================================================================================
// Shared Access Token Slot
//=========================================================================================

/// A shared slot holding the current bearer token.
///
/// The session store writes it on login/logout; the HTTP adapter reads it
/// when attaching the `Authorization` header. Sharing the slot avoids a
/// dependency cycle between the two.
#[derive(Clone, Default)]
pub struct TokenCell {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: &str) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(token.to_string());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = None;
        }
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_cell_set_get_clear() {
        let cell = TokenCell::new();
        assert_eq!(cell.get(), None);
        cell.set("abc");
        assert_eq!(cell.get().as_deref(), Some("abc"));
        let alias = cell.clone();
        alias.clear();
        assert_eq!(cell.get(), None);
    }
}
