//! crates/budget_core/src/coordinator.rs
//!
//! The mutation coordinator: serializes user-initiated writes against the
//! backend and enforces the write-then-reload policy. Every mutation runs
//! as validate -> dispatch -> full snapshot refresh; the local snapshot is
//! never patched optimistically, so the presentation layer only ever sees
//! server-confirmed state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::domain::{ExpenseId, ExpensePatch, ExpenseRecord, Money, NewExpense};
use crate::error::{BudgetError, BudgetResult};
use crate::ports::BudgetBackend;
use crate::snapshot::SnapshotCell;

//=========================================================================================
// In-Flight Tracking
//=========================================================================================

/// The logical resource a mutation targets. At most one mutation per
/// resource may be in flight from this client instance; a reset conflicts
/// with everything. Creates target records that do not exist yet, so each
/// one gets its own ticket and they never conflict with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Resource {
    Create(u64),
    Expense(ExpenseId),
    Salary,
    Budget,
    Everything,
}

impl Resource {
    fn describe(&self) -> String {
        match self {
            Resource::Create(_) => "a new expense".to_string(),
            Resource::Expense(id) => format!("expense {id}"),
            Resource::Salary => "the salary".to_string(),
            Resource::Budget => "the budget".to_string(),
            Resource::Everything => "the account".to_string(),
        }
    }
}

type InFlightSet = Arc<Mutex<HashSet<Resource>>>;

/// Marks a resource busy for as long as the guard lives. A conflicting
/// second request is rejected with [`BudgetError::Busy`], never silently
/// dropped or raced.
struct InFlightGuard {
    set: InFlightSet,
    resource: Resource,
}

impl InFlightGuard {
    fn acquire(set: &InFlightSet, resource: Resource) -> BudgetResult<Self> {
        let mut in_flight = set
            .lock()
            .map_err(|_| BudgetError::Busy(resource.describe()))?;
        let conflict = in_flight.contains(&Resource::Everything)
            || in_flight.contains(&resource)
            || (resource == Resource::Everything && !in_flight.is_empty());
        if conflict {
            return Err(BudgetError::Busy(resource.describe()));
        }
        in_flight.insert(resource.clone());
        Ok(Self {
            set: Arc::clone(set),
            resource,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.set.lock() {
            in_flight.remove(&self.resource);
        }
    }
}

//=========================================================================================
// Validation (runs before any dispatch)
//=========================================================================================

fn validate_new_expense(expense: &NewExpense) -> BudgetResult<()> {
    if expense.name.trim().is_empty() {
        return Err(BudgetError::Validation("expense name must not be empty".into()));
    }
    if expense.amount <= Money::zero() {
        return Err(BudgetError::Validation(
            "expense amount must be a positive number".into(),
        ));
    }
    Ok(())
}

fn validate_patch(patch: &ExpensePatch) -> BudgetResult<()> {
    if patch.is_empty() {
        return Err(BudgetError::Validation("nothing to update".into()));
    }
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(BudgetError::Validation("expense name must not be empty".into()));
        }
    }
    if let Some(amount) = patch.amount {
        if amount <= Money::zero() {
            return Err(BudgetError::Validation(
                "expense amount must be a positive number".into(),
            ));
        }
    }
    Ok(())
}

fn validate_non_negative(amount: Money, what: &str) -> BudgetResult<()> {
    if amount.is_negative() {
        return Err(BudgetError::Validation(format!(
            "{what} must be a non-negative number"
        )));
    }
    Ok(())
}

//=========================================================================================
// The Coordinator
//=========================================================================================

pub struct MutationCoordinator {
    backend: Arc<dyn BudgetBackend>,
    snapshot: Arc<SnapshotCell>,
    in_flight: InFlightSet,
    create_seq: AtomicU64,
}

impl MutationCoordinator {
    pub fn new(backend: Arc<dyn BudgetBackend>, snapshot: Arc<SnapshotCell>) -> Self {
        Self {
            backend,
            snapshot,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            create_seq: AtomicU64::new(0),
        }
    }

    /// Validates, dispatches the create, then reloads the snapshot. The
    /// returned record is the server's echo; the snapshot refresh is what
    /// the views actually render from.
    pub async fn add_expense(
        &self,
        email: &str,
        mut expense: NewExpense,
    ) -> BudgetResult<ExpenseRecord> {
        validate_new_expense(&expense)?;
        if expense.date.is_none() {
            expense.date = Some(chrono::Local::now().date_naive());
        }
        let ticket = self.create_seq.fetch_add(1, Ordering::Relaxed);
        let _guard = InFlightGuard::acquire(&self.in_flight, Resource::Create(ticket))?;
        let record = self.backend.add_expense(email, &expense).await?;
        debug!(id = %record.id, "expense created");
        self.snapshot.refresh(self.backend.as_ref(), email).await?;
        Ok(record)
    }

    pub async fn update_expense(
        &self,
        email: &str,
        id: &ExpenseId,
        patch: ExpensePatch,
    ) -> BudgetResult<ExpenseRecord> {
        validate_patch(&patch)?;
        let _guard = InFlightGuard::acquire(&self.in_flight, Resource::Expense(id.clone()))?;
        let record = self.backend.update_expense(id, &patch).await?;
        debug!(id = %record.id, "expense updated");
        self.snapshot.refresh(self.backend.as_ref(), email).await?;
        Ok(record)
    }

    pub async fn delete_expense(&self, email: &str, id: &ExpenseId) -> BudgetResult<()> {
        let _guard = InFlightGuard::acquire(&self.in_flight, Resource::Expense(id.clone()))?;
        self.backend.delete_expense(id).await?;
        debug!(%id, "expense deleted");
        self.snapshot.refresh(self.backend.as_ref(), email).await?;
        Ok(())
    }

    pub async fn set_salary(&self, email: &str, amount: Money) -> BudgetResult<()> {
        validate_non_negative(amount, "salary")?;
        let _guard = InFlightGuard::acquire(&self.in_flight, Resource::Salary)?;
        self.backend.set_salary(email, amount).await?;
        self.snapshot.refresh(self.backend.as_ref(), email).await?;
        Ok(())
    }

    pub async fn set_budget(&self, email: &str, amount: Money) -> BudgetResult<()> {
        validate_non_negative(amount, "budget")?;
        let _guard = InFlightGuard::acquire(&self.in_flight, Resource::Budget)?;
        self.backend.set_budget(email, amount).await?;
        self.snapshot.refresh(self.backend.as_ref(), email).await?;
        Ok(())
    }

    /// Clears salary, budget and all expenses. Conflicts with every other
    /// in-flight mutation.
    pub async fn reset_all(&self, email: &str) -> BudgetResult<()> {
        let _guard = InFlightGuard::acquire(&self.in_flight, Resource::Everything)?;
        self.backend.reset_all(email).await?;
        self.snapshot.refresh(self.backend.as_ref(), email).await?;
        Ok(())
    }
}
