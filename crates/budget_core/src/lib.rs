pub mod coordinator;
pub mod derive;
pub mod domain;
pub mod error;
pub mod ports;
pub mod session;
pub mod snapshot;
pub mod tracker;

pub use domain::{
    BudgetSnapshot, CategorySet, ExpenseId, ExpensePatch, ExpenseRecord, Money, MonthKey,
    MonthlyTrend, NewExpense, Persistence, ReportFormat, Session, StoredIdentity, TrendsSummary,
};
pub use error::{BudgetError, BudgetResult};
pub use ports::{
    BackendError, BackendResult, BudgetBackend, IdentityStore, LoginTokens, StoreError, TokenCell,
};
pub use tracker::BudgetTracker;
