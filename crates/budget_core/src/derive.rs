//! crates/budget_core/src/derive.rs
//!
//! The derivation engine: pure, synchronous, total functions from a
//! [`BudgetSnapshot`] to the read-only values every view renders. Nothing
//! here is ever stored; callers recompute on each snapshot change.

use std::collections::BTreeMap;

use crate::domain::{BudgetSnapshot, CategorySet, Money, MonthKey};

/// Sum of all expense amounts. An empty collection sums to zero.
pub fn total_expenses(snapshot: &BudgetSnapshot) -> Money {
    snapshot.expenses.iter().map(|e| e.amount).sum()
}

/// Salary minus total expenses. A negative balance is a meaningful
/// over-budget state, not an error; no clamping.
pub fn balance(snapshot: &BudgetSnapshot) -> Money {
    snapshot.salary - total_expenses(snapshot)
}

/// Per-category sums over the configured label set.
///
/// Every label in the set appears in the result (zero when unused), and
/// expenses with a missing or unrecognized category fold into the set's
/// default label, so the returned sums partition the expense collection
/// exactly once each.
pub fn category_totals(
    snapshot: &BudgetSnapshot,
    categories: &CategorySet,
) -> BTreeMap<String, Money> {
    let mut totals: BTreeMap<String, Money> = categories
        .labels()
        .iter()
        .map(|label| (label.clone(), Money::zero()))
        .collect();

    for expense in &snapshot.expenses {
        let label = categories.fold(expense.category.as_deref());
        if let Some(total) = totals.get_mut(label) {
            *total += expense.amount;
        }
    }
    totals
}

/// Per-calendar-month sums, keyed by the month of each expense's date.
///
/// The result is sparse: months with no expenses are not synthesized.
/// Zero-filling a dense series is the presentation layer's job.
pub fn monthly_totals(snapshot: &BudgetSnapshot) -> BTreeMap<MonthKey, Money> {
    let mut totals: BTreeMap<MonthKey, Money> = BTreeMap::new();
    for expense in &snapshot.expenses {
        *totals
            .entry(MonthKey::from_date(expense.date))
            .or_insert_with(Money::zero) += expense.amount;
    }
    totals
}

/// Advisory flags the presentation layer turns into banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Warnings {
    pub budget_exceeds_salary: bool,
    pub balance_negative: bool,
}

pub fn warnings(snapshot: &BudgetSnapshot) -> Warnings {
    Warnings {
        budget_exceeds_salary: snapshot.budget_limit > snapshot.salary,
        balance_negative: balance(snapshot).is_negative(),
    }
}

/// All derived values for one snapshot, computed in one pass for callers
/// that render everything at once.
#[derive(Debug, Clone)]
pub struct DerivedView {
    pub total_expenses: Money,
    pub balance: Money,
    pub category_totals: BTreeMap<String, Money>,
    pub monthly_totals: BTreeMap<MonthKey, Money>,
    pub warnings: Warnings,
}

pub fn project(snapshot: &BudgetSnapshot, categories: &CategorySet) -> DerivedView {
    DerivedView {
        total_expenses: total_expenses(snapshot),
        balance: balance(snapshot),
        category_totals: category_totals(snapshot, categories),
        monthly_totals: monthly_totals(snapshot),
        warnings: warnings(snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpenseId, ExpenseRecord};
    use chrono::NaiveDate;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn expense(id: &str, amount: &str, category: Option<&str>, date: &str) -> ExpenseRecord {
        ExpenseRecord {
            id: ExpenseId::from(id),
            name: format!("expense {id}"),
            amount: money(amount),
            category: category.map(String::from),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    fn snapshot(salary: &str, budget: &str, expenses: Vec<ExpenseRecord>) -> BudgetSnapshot {
        BudgetSnapshot {
            salary: money(salary),
            budget_limit: money(budget),
            expenses,
        }
    }

    #[test]
    fn empty_snapshot_totals_zero() {
        let s = snapshot("0", "0", vec![]);
        assert_eq!(total_expenses(&s), Money::zero());
        assert_eq!(balance(&s), Money::zero());
        assert!(monthly_totals(&s).is_empty());
    }

    #[test]
    fn salary_minus_expenses() {
        // salary=60000, expenses 12500 + 17500 => total 30000, balance 30000
        let s = snapshot(
            "60000",
            "0",
            vec![
                expense("1", "12500", Some("Travel"), "2025-09-16"),
                expense("2", "17500", Some("Hotel"), "2025-09-17"),
            ],
        );
        assert_eq!(total_expenses(&s), money("30000"));
        assert_eq!(balance(&s), money("30000"));
    }

    #[test]
    fn balance_goes_negative_without_clamping() {
        let s = snapshot("100", "0", vec![expense("1", "250.50", None, "2025-01-02")]);
        assert_eq!(balance(&s), money("-150.50"));
        assert!(warnings(&s).balance_negative);
    }

    #[test]
    fn budget_above_salary_raises_warning() {
        let s = snapshot("60000", "70000", vec![]);
        let w = warnings(&s);
        assert!(w.budget_exceeds_salary);
        assert!(!w.balance_negative);
    }

    #[test]
    fn budget_equal_to_salary_is_fine() {
        let s = snapshot("60000", "60000", vec![]);
        assert!(!warnings(&s).budget_exceeds_salary);
    }

    #[test]
    fn category_totals_partition_the_expense_set() {
        let set = CategorySet::default();
        let s = snapshot(
            "0",
            "0",
            vec![
                expense("1", "10", Some("Fuel"), "2025-09-01"),
                expense("2", "20", Some("Fuel"), "2025-09-02"),
                expense("3", "5", Some("Yachts"), "2025-09-03"), // unrecognized
                expense("4", "2.50", None, "2025-09-04"),        // missing
            ],
        );
        let totals = category_totals(&s, &set);
        assert_eq!(totals["Fuel"], money("30"));
        assert_eq!(totals["Miscellaneous"], money("7.50"));
        assert_eq!(totals["Travel"], Money::zero());

        let sum: Money = totals.values().copied().sum();
        assert_eq!(sum, total_expenses(&s));
    }

    #[test]
    fn category_totals_list_every_configured_label() {
        let set = CategorySet::default();
        let totals = category_totals(&snapshot("0", "0", vec![]), &set);
        assert_eq!(totals.len(), set.labels().len());
    }

    #[test]
    fn monthly_totals_group_by_calendar_month_sparsely() {
        let s = snapshot(
            "0",
            "0",
            vec![
                expense("1", "100", None, "2025-09-16"),
                expense("2", "50", None, "2025-09-30"),
                expense("3", "25", None, "2025-11-01"),
            ],
        );
        let totals = monthly_totals(&s);
        assert_eq!(totals.len(), 2); // October is not synthesized
        assert_eq!(totals[&MonthKey { year: 2025, month: 9 }], money("150"));
        assert_eq!(totals[&MonthKey { year: 2025, month: 11 }], money("25"));
    }

    #[test]
    fn project_agrees_with_individual_functions() {
        let set = CategorySet::default();
        let s = snapshot("500", "600", vec![expense("1", "50", Some("Fuel"), "2025-03-03")]);
        let view = project(&s, &set);
        assert_eq!(view.total_expenses, total_expenses(&s));
        assert_eq!(view.balance, balance(&s));
        assert_eq!(view.warnings, warnings(&s));
        assert_eq!(view.category_totals, category_totals(&s, &set));
        assert_eq!(view.monthly_totals, monthly_totals(&s));
    }
}
