//! crates/budget_core/src/snapshot.rs
//!
//! The budget snapshot cell: the one shared mutable resource in a client
//! instance. It is only ever replaced wholesale by a refresh, never
//! incrementally patched, which is what makes the write-then-reload
//! consistency policy safe to reason about.

use std::sync::RwLock;
use tracing::debug;

use crate::domain::BudgetSnapshot;
use crate::ports::{BackendResult, BudgetBackend};

pub struct SnapshotCell {
    current: RwLock<Option<BudgetSnapshot>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Fetches the full profile and replaces the local snapshot atomically.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// returned; existing data must not flash to empty on a transient
    /// network failure.
    pub async fn refresh(
        &self,
        backend: &dyn BudgetBackend,
        email: &str,
    ) -> BackendResult<BudgetSnapshot> {
        let snapshot = backend.fetch_profile(email).await?;
        debug!(
            expenses = snapshot.expenses.len(),
            "snapshot refreshed from backend"
        );
        self.replace(snapshot.clone());
        Ok(snapshot)
    }

    fn replace(&self, snapshot: BudgetSnapshot) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(snapshot);
        }
    }

    pub fn get(&self) -> Option<BudgetSnapshot> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    /// Drops the snapshot, e.g. after logout.
    pub fn clear(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}
