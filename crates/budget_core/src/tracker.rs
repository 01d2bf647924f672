//! crates/budget_core/src/tracker.rs
//!
//! The facade the presentation layer talks to. It wires the session store,
//! snapshot cell, mutation coordinator and derivation engine together and
//! enforces the one cross-cutting rule: any authorization failure outside
//! the login flow itself forces a logout.

use std::sync::Arc;
use tracing::info;

use crate::coordinator::MutationCoordinator;
use crate::derive::{self, DerivedView};
use crate::domain::{
    BudgetSnapshot, CategorySet, ExpenseId, ExpensePatch, ExpenseRecord, Money, MonthlyTrend,
    NewExpense, ReportFormat, Session, TrendsSummary,
};
use crate::error::{BudgetError, BudgetResult};
use crate::ports::{BudgetBackend, IdentityStore, TokenCell};
use crate::session::SessionStore;
use crate::snapshot::SnapshotCell;

pub struct BudgetTracker {
    backend: Arc<dyn BudgetBackend>,
    session: SessionStore,
    snapshot: Arc<SnapshotCell>,
    coordinator: MutationCoordinator,
    categories: CategorySet,
}

impl BudgetTracker {
    pub fn new(
        backend: Arc<dyn BudgetBackend>,
        durable: Arc<dyn IdentityStore>,
        ephemeral: Arc<dyn IdentityStore>,
        token: TokenCell,
        categories: CategorySet,
    ) -> Self {
        let snapshot = Arc::new(SnapshotCell::new());
        Self {
            session: SessionStore::new(durable, ephemeral, token),
            coordinator: MutationCoordinator::new(Arc::clone(&backend), Arc::clone(&snapshot)),
            backend,
            snapshot,
            categories,
        }
    }

    /// Maps an `Auth` failure on an authenticated call into a forced
    /// logout. Leaves every other outcome untouched.
    fn check<T>(&self, result: BudgetResult<T>) -> BudgetResult<T> {
        if matches!(result, Err(BudgetError::Auth)) && self.session.current().is_some() {
            self.session.expire();
            self.snapshot.clear();
        }
        result
    }

    fn require_email(&self) -> BudgetResult<String> {
        self.session.current_user().ok_or(BudgetError::Auth)
    }

    //=====================================================================================
    // Session lifecycle
    //=====================================================================================

    pub async fn register(&self, email: &str, password: &str) -> BudgetResult<()> {
        validate_credentials(email, password)?;
        self.backend.register(email, password).await?;
        info!(email, "account registered");
        Ok(())
    }

    /// Exchanges credentials for tokens, installs the session in the tier
    /// selected by `remember`, and performs the initial snapshot fetch.
    ///
    /// A credential failure returns [`BudgetError::Auth`] without touching
    /// any state and without attempting a snapshot fetch. If the login
    /// itself succeeds but the initial fetch fails, the session stands and
    /// the fetch error is returned; the caller may retry with [`refresh`].
    ///
    /// [`refresh`]: BudgetTracker::refresh
    pub async fn login(&self, email: &str, password: &str, remember: bool) -> BudgetResult<Session> {
        validate_credentials(email, password)?;
        let tokens = self.backend.login(email, password).await?;
        let session = self.session.establish(email, tokens, remember);
        info!(email, remember, "logged in");
        self.refresh().await?;
        Ok(session)
    }

    /// Restores a previously saved identity, durable tier first. The token
    /// is not validated here; an expired one surfaces as a forced logout on
    /// the first authenticated call.
    pub fn restore_session(&self) -> Option<Session> {
        self.session.restore()
    }

    /// Client-local logout: clears both storage tiers and the snapshot.
    pub fn logout(&self) {
        self.session.logout();
        self.snapshot.clear();
        info!("logged out");
    }

    pub fn current_user(&self) -> Option<String> {
        self.session.current_user()
    }

    //=====================================================================================
    // Snapshot and derived reads
    //=====================================================================================

    /// Re-fetches the full profile and replaces the snapshot wholesale.
    pub async fn refresh(&self) -> BudgetResult<BudgetSnapshot> {
        let email = self.require_email()?;
        let result = self
            .snapshot
            .refresh(self.backend.as_ref(), &email)
            .await
            .map_err(BudgetError::from);
        self.check(result)
    }

    /// The last server-confirmed snapshot, if any fetch has succeeded yet.
    pub fn snapshot(&self) -> Option<BudgetSnapshot> {
        self.snapshot.get()
    }

    /// All derived values for the current snapshot. `None` until the first
    /// successful fetch.
    pub fn derived(&self) -> Option<DerivedView> {
        self.snapshot
            .get()
            .map(|s| derive::project(&s, &self.categories))
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    //=====================================================================================
    // Mutations (validate -> dispatch -> reload, via the coordinator)
    //=====================================================================================

    pub async fn add_expense(&self, expense: NewExpense) -> BudgetResult<ExpenseRecord> {
        let email = self.require_email()?;
        let result = self.coordinator.add_expense(&email, expense).await;
        self.check(result)
    }

    pub async fn update_expense(
        &self,
        id: &ExpenseId,
        patch: ExpensePatch,
    ) -> BudgetResult<ExpenseRecord> {
        let email = self.require_email()?;
        let result = self.coordinator.update_expense(&email, id, patch).await;
        self.check(result)
    }

    pub async fn delete_expense(&self, id: &ExpenseId) -> BudgetResult<()> {
        let email = self.require_email()?;
        let result = self.coordinator.delete_expense(&email, id).await;
        self.check(result)
    }

    pub async fn set_salary(&self, amount: Money) -> BudgetResult<()> {
        let email = self.require_email()?;
        let result = self.coordinator.set_salary(&email, amount).await;
        self.check(result)
    }

    pub async fn set_budget(&self, amount: Money) -> BudgetResult<()> {
        let email = self.require_email()?;
        let result = self.coordinator.set_budget(&email, amount).await;
        self.check(result)
    }

    pub async fn reset_all(&self) -> BudgetResult<()> {
        let email = self.require_email()?;
        let result = self.coordinator.reset_all(&email).await;
        self.check(result)
    }

    //=====================================================================================
    // Trends and reports (server-computed; passed through untouched)
    //=====================================================================================

    pub async fn monthly_trends(&self) -> BudgetResult<Vec<MonthlyTrend>> {
        let email = self.require_email()?;
        let result = self
            .backend
            .monthly_trends(&email)
            .await
            .map_err(BudgetError::from);
        self.check(result)
    }

    pub async fn trends_summary(&self) -> BudgetResult<TrendsSummary> {
        let email = self.require_email()?;
        let result = self
            .backend
            .trends_summary(&email)
            .await
            .map_err(BudgetError::from);
        self.check(result)
    }

    /// Downloads a rendered report blob; saving it somewhere is the
    /// caller's job.
    pub async fn download_report(&self, format: ReportFormat) -> BudgetResult<Vec<u8>> {
        let email = self.require_email()?;
        let result = self
            .backend
            .download_report(&email, format)
            .await
            .map_err(BudgetError::from);
        self.check(result)
    }
}

fn validate_credentials(email: &str, password: &str) -> BudgetResult<()> {
    if email.trim().is_empty() {
        return Err(BudgetError::Validation("email must not be empty".into()));
    }
    if password.is_empty() {
        return Err(BudgetError::Validation("password must not be empty".into()));
    }
    Ok(())
}
