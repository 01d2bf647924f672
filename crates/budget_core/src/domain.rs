//! crates/budget_core/src/domain.rs
//!
//! Defines the pure, core data structures for the budget tracker.
//! These are the single canonical shapes for the whole client; backend
//! adapters map their wire formats into them at the boundary.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// A currency amount backed by a fixed-point decimal.
///
/// All summation in the derivation engine happens on this type, so
/// aggregates never accumulate floating-point drift. Display formatting
/// for a particular currency is the presentation layer's problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Money(pub Decimal);

impl Money {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Money(Decimal::from_str_exact(s.trim())?))
    }
}

/// A server-assigned expense identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpenseId(pub String);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExpenseId {
    fn from(s: &str) -> Self {
        ExpenseId(s.to_string())
    }
}

/// A single categorized expense, as last confirmed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub name: String,
    pub amount: Money,
    /// `None` folds into the category set's default label during derivation.
    pub category: Option<String>,
    pub date: NaiveDate,
}

/// Payload for creating an expense. The id is assigned by the backend.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub name: String,
    pub amount: Money,
    pub category: Option<String>,
    /// Defaults to today when absent.
    pub date: Option<NaiveDate>,
}

/// A partial update to an existing expense. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub name: Option<String>,
    pub amount: Option<Money>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
    }
}

/// The complete, authoritative in-memory copy of a user's figures as last
/// confirmed by the backend. Only ever replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BudgetSnapshot {
    pub salary: Money,
    pub budget_limit: Money,
    pub expenses: Vec<ExpenseRecord>,
}

/// Which storage tier an identity was saved to at login time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Survives restarts; chosen when the user asked to be remembered.
    Durable,
    /// Scoped to the running process; gone after a restart.
    Ephemeral,
}

/// The active authenticated identity for this client instance.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub persistence: Persistence,
}

/// The identity record persisted to a storage tier between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub email: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// The set of recognized category labels, supplied as configuration.
///
/// Expenses tagged with anything outside `labels` (or with no category at
/// all) fold into `default_label`.
#[derive(Debug, Clone)]
pub struct CategorySet {
    labels: Vec<String>,
    default_label: String,
}

impl CategorySet {
    /// Builds a category set. The default label is appended to the label
    /// list if it is not already present, so the fold target always exists.
    pub fn new(mut labels: Vec<String>, default_label: impl Into<String>) -> Self {
        let default_label = default_label.into();
        if !labels.iter().any(|l| l == &default_label) {
            labels.push(default_label.clone());
        }
        Self {
            labels,
            default_label,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    /// Resolves an expense's category to a recognized label.
    pub fn fold<'a>(&'a self, category: Option<&'a str>) -> &'a str {
        match category {
            Some(c) if self.labels.iter().any(|l| l == c) => c,
            _ => &self.default_label,
        }
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::new(
            ["Fuel", "Shopping", "Travel", "Hotel", "Groceries"]
                .into_iter()
                .map(String::from)
                .collect(),
            "Miscellaneous",
        )
    }
}

/// A calendar month used as the grouping key for monthly totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One month's aggregates as reported by the backend trends endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTrend {
    pub month: String,
    pub salary: Money,
    pub total_expenses: Money,
    pub savings: Money,
}

/// The backend's overall trends report.
#[derive(Debug, Clone)]
pub struct TrendsSummary {
    pub salary: Money,
    pub total_expenses: Money,
    pub savings: Money,
    pub expenses: Vec<ExpenseRecord>,
}

/// Export formats the backend can render a report in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Xlsx,
    Pdf,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_sums_without_drift() {
        let parts: Vec<Money> = ["0.10", "0.20", "0.30"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let total: Money = parts.into_iter().sum();
        assert_eq!(total, "0.60".parse().unwrap());
    }

    #[test]
    fn money_zero_is_not_negative() {
        assert!(!Money::zero().is_negative());
        assert!("-1".parse::<Money>().unwrap().is_negative());
    }

    #[test]
    fn category_set_folds_unknown_and_missing() {
        let set = CategorySet::default();
        assert_eq!(set.fold(Some("Fuel")), "Fuel");
        assert_eq!(set.fold(Some("Yachts")), "Miscellaneous");
        assert_eq!(set.fold(None), "Miscellaneous");
    }

    #[test]
    fn category_set_always_contains_default() {
        let set = CategorySet::new(vec!["Food".into()], "Other");
        assert!(set.labels().iter().any(|l| l == "Other"));
        assert_eq!(set.fold(None), "Other");
    }

    #[test]
    fn month_key_orders_and_formats() {
        let a = MonthKey::from_date(NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
        let b = MonthKey::from_date(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert!(a < b);
        assert_eq!(a.to_string(), "2025-09");
    }
}
