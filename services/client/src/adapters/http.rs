//! services/client/src/adapters/http.rs
//!
//! This module contains the REST adapter, which is the concrete implementation
//! of the `BudgetBackend` port from the `core` crate. It handles all wire-level
//! concerns with `reqwest`: routes, JSON bodies, the bearer header, and the
//! mapping from the backend's historically inconsistent field names into the
//! one canonical domain shape.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use budget_core::{
    BackendError, BackendResult, BudgetBackend, BudgetSnapshot, ExpenseId, ExpensePatch,
    ExpenseRecord, LoginTokens, Money, MonthlyTrend, NewExpense, ReportFormat, TokenCell,
    TrendsSummary,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A REST adapter that implements the `BudgetBackend` port.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: TokenCell,
}

impl HttpBackend {
    /// Creates a new `HttpBackend`. The token cell is shared with the
    /// session store, which keeps it current across login and logout.
    pub fn new(base_url: &str, token: TokenCell) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token.get() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> BackendResult<Response> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Server(error_message(status, &body)));
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> BackendResult<T> {
        let resp = self.send(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| BackendError::Server(format!("unreadable response body: {e}")))
    }

    /// Sends a request whose response body we don't care about beyond
    /// success or failure.
    async fn send_unit(&self, req: RequestBuilder) -> BackendResult<()> {
        self.send(req).await.map(|_| ())
    }
}

/// Extracts the user-facing message from a non-2xx body: the backend uses
/// `error` or `message` depending on the revision; fall back to the status
/// line when neither is present.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.error.or(parsed.message) {
            if !msg.trim().is_empty() {
                return msg;
            }
        }
    }
    format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("error")
    )
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "accessToken", alias = "token")]
    access_token: String,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    salary: f64,
    #[serde(default)]
    budget: f64,
    #[serde(default)]
    expenses: Vec<ExpenseDto>,
}

impl ProfileResponse {
    fn to_domain(self) -> Result<BudgetSnapshot, rust_decimal::Error> {
        Ok(BudgetSnapshot {
            salary: to_money(self.salary)?,
            budget_limit: to_money(self.budget)?,
            expenses: self
                .expenses
                .into_iter()
                .map(ExpenseDto::to_domain)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// One expense as the backend sends it. Field names drifted across backend
/// revisions (name/description/title, id/_id), hence the aliases.
#[derive(Deserialize)]
struct ExpenseDto {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default, alias = "description", alias = "title")]
    name: String,
    #[serde(default)]
    amount: f64,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl ExpenseDto {
    fn to_domain(self) -> Result<ExpenseRecord, rust_decimal::Error> {
        Ok(ExpenseRecord {
            id: ExpenseId(self.id),
            name: self.name,
            amount: to_money(self.amount)?,
            category: self.category.filter(|c| !c.trim().is_empty()),
            date: parse_date_any(self.date.as_deref()),
        })
    }
}

#[derive(Deserialize)]
struct MonthlyTrendsResponse {
    #[serde(default)]
    monthly_trends: Vec<MonthlyTrendDto>,
}

#[derive(Deserialize)]
struct MonthlyTrendDto {
    month: String,
    #[serde(default)]
    salary: f64,
    #[serde(default)]
    total_expenses: f64,
    #[serde(default)]
    savings: f64,
}

impl MonthlyTrendDto {
    fn to_domain(self) -> Result<MonthlyTrend, rust_decimal::Error> {
        Ok(MonthlyTrend {
            month: self.month,
            salary: to_money(self.salary)?,
            total_expenses: to_money(self.total_expenses)?,
            savings: to_money(self.savings)?,
        })
    }
}

#[derive(Deserialize)]
struct TrendsResponse {
    #[serde(default)]
    salary: f64,
    #[serde(default, alias = "totalExpenses")]
    total_expenses: f64,
    #[serde(default)]
    savings: f64,
    #[serde(default)]
    expenses: Vec<ExpenseDto>,
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AddExpenseBody<'a> {
    email: &'a str,
    name: &'a str,
    amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Serialize)]
struct UpdateExpenseBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Serialize)]
struct SalaryBody<'a> {
    email: &'a str,
    salary: f64,
}

#[derive(Serialize)]
struct BudgetBody<'a> {
    email: &'a str,
    budget: f64,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

/// Wire amounts arrive as JSON numbers. Anything a fixed-point decimal
/// cannot represent is a malformed response, never a zero.
fn to_money(value: f64) -> Result<Money, rust_decimal::Error> {
    Ok(Money(Decimal::try_from(value)?))
}

fn bad_amount(e: rust_decimal::Error) -> BackendError {
    BackendError::Server(format!("unreadable amount in response: {e}"))
}

fn from_money(value: Money) -> f64 {
    value.0.to_f64().unwrap_or(0.0)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The backend has emitted both bare dates and full timestamps; take the
/// date prefix and fall back to today when nothing parses.
fn parse_date_any(raw: Option<&str>) -> NaiveDate {
    raw.and_then(|s| {
        let prefix = s.get(..10).unwrap_or(s);
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(prefix, "%Y/%m/%d"))
            .ok()
    })
    .unwrap_or_else(|| chrono::Local::now().date_naive())
}

//=========================================================================================
// `BudgetBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl BudgetBackend for HttpBackend {
    async fn register(&self, email: &str, password: &str) -> BackendResult<()> {
        let body = CredentialsBody { email, password };
        self.send_unit(self.client.post(self.url("/auth/register")).json(&body))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> BackendResult<LoginTokens> {
        let body = CredentialsBody { email, password };
        let resp: LoginResponse = self
            .send_json(self.client.post(self.url("/auth/login")).json(&body))
            .await?;
        Ok(LoginTokens {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
        })
    }

    async fn fetch_profile(&self, email: &str) -> BackendResult<BudgetSnapshot> {
        let resp: ProfileResponse = self
            .send_json(self.client.get(self.url(&format!("/auth/user/{email}"))))
            .await?;
        debug!(expenses = resp.expenses.len(), "profile fetched");
        resp.to_domain().map_err(bad_amount)
    }

    async fn add_expense(&self, email: &str, expense: &NewExpense) -> BackendResult<ExpenseRecord> {
        let body = AddExpenseBody {
            email,
            name: &expense.name,
            amount: from_money(expense.amount),
            category: expense.category.as_deref(),
            date: expense.date.map(format_date),
        };
        let dto: ExpenseDto = self
            .send_json(self.client.post(self.url("/budget/add")).json(&body))
            .await?;
        dto.to_domain().map_err(bad_amount)
    }

    async fn update_expense(
        &self,
        id: &ExpenseId,
        patch: &ExpensePatch,
    ) -> BackendResult<ExpenseRecord> {
        let body = UpdateExpenseBody {
            name: patch.name.as_deref(),
            amount: patch.amount.map(from_money),
            category: patch.category.as_deref(),
            date: patch.date.map(format_date),
        };
        let dto: ExpenseDto = self
            .send_json(
                self.client
                    .put(self.url(&format!("/budget/update/{id}")))
                    .json(&body),
            )
            .await?;
        dto.to_domain().map_err(bad_amount)
    }

    async fn delete_expense(&self, id: &ExpenseId) -> BackendResult<()> {
        self.send_unit(self.client.delete(self.url(&format!("/budget/delete/{id}"))))
            .await
    }

    async fn set_salary(&self, email: &str, amount: Money) -> BackendResult<()> {
        let body = SalaryBody {
            email,
            salary: from_money(amount),
        };
        self.send_unit(self.client.put(self.url("/budget/salary")).json(&body))
            .await
    }

    async fn set_budget(&self, email: &str, amount: Money) -> BackendResult<()> {
        let body = BudgetBody {
            email,
            budget: from_money(amount),
        };
        self.send_unit(self.client.put(self.url("/budget/budget")).json(&body))
            .await
    }

    async fn reset_all(&self, email: &str) -> BackendResult<()> {
        self.send_unit(
            self.client
                .post(self.url("/budget/reset"))
                .json(&EmailBody { email }),
        )
        .await
    }

    async fn monthly_trends(&self, email: &str) -> BackendResult<Vec<MonthlyTrend>> {
        let resp: MonthlyTrendsResponse = self
            .send_json(
                self.client
                    .get(self.url("/budget/monthly-trends"))
                    .query(&[("email", email)]),
            )
            .await?;
        resp.monthly_trends
            .into_iter()
            .map(MonthlyTrendDto::to_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(bad_amount)
    }

    async fn trends_summary(&self, email: &str) -> BackendResult<TrendsSummary> {
        let resp: TrendsResponse = self
            .send_json(
                self.client
                    .get(self.url("/budget/trends"))
                    .query(&[("email", email)]),
            )
            .await?;
        Ok(TrendsSummary {
            salary: to_money(resp.salary).map_err(bad_amount)?,
            total_expenses: to_money(resp.total_expenses).map_err(bad_amount)?,
            savings: to_money(resp.savings).map_err(bad_amount)?,
            expenses: resp
                .expenses
                .into_iter()
                .map(ExpenseDto::to_domain)
                .collect::<Result<_, _>>()
                .map_err(bad_amount)?,
        })
    }

    async fn download_report(&self, email: &str, format: ReportFormat) -> BackendResult<Vec<u8>> {
        let path = format!("/budget/download-expenses-{}", format.as_str());
        let resp = self
            .send(self.client.get(self.url(&path)).query(&[("email", email)]))
            .await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_maps_into_canonical_shape() {
        let raw = r#"{
            "salary": 60000,
            "budget": 70000,
            "expenses": [
                {"_id": "abc", "description": "flight", "amount": 12500.5, "category": "Travel", "date": "2025-09-16"},
                {"id": "def", "name": "snacks", "amount": 3}
            ]
        }"#;
        let profile: ProfileResponse = serde_json::from_str(raw).unwrap();
        let snapshot = profile.to_domain().unwrap();

        assert_eq!(snapshot.salary, "60000".parse().unwrap());
        assert_eq!(snapshot.budget_limit, "70000".parse().unwrap());
        assert_eq!(snapshot.expenses.len(), 2);

        let flight = &snapshot.expenses[0];
        assert_eq!(flight.id, ExpenseId::from("abc"));
        assert_eq!(flight.name, "flight");
        assert_eq!(flight.amount, "12500.5".parse().unwrap());
        assert_eq!(flight.category.as_deref(), Some("Travel"));
        assert_eq!(flight.date.to_string(), "2025-09-16");

        let snacks = &snapshot.expenses[1];
        assert_eq!(snacks.id, ExpenseId::from("def"));
        assert_eq!(snacks.category, None);
    }

    #[test]
    fn missing_profile_fields_default_to_zero() {
        let profile: ProfileResponse = serde_json::from_str("{}").unwrap();
        let snapshot = profile.to_domain().unwrap();
        assert_eq!(snapshot.salary, Money::zero());
        assert!(snapshot.expenses.is_empty());
    }

    #[test]
    fn unrepresentable_amounts_are_errors_not_zero() {
        let raw = r#"{"salary": 1e300, "budget": 0, "expenses": []}"#;
        let profile: ProfileResponse = serde_json::from_str(raw).unwrap();
        assert!(profile.to_domain().is_err());

        let dto: ExpenseDto =
            serde_json::from_str(r#"{"id": "a", "name": "rounding", "amount": 1e300}"#).unwrap();
        assert!(dto.to_domain().is_err());
    }

    #[test]
    fn login_response_accepts_both_casings() {
        let snake: LoginResponse =
            serde_json::from_str(r#"{"access_token": "a", "refresh_token": "r"}"#).unwrap();
        assert_eq!(snake.access_token, "a");
        assert_eq!(snake.refresh_token.as_deref(), Some("r"));

        let camel: LoginResponse = serde_json::from_str(r#"{"accessToken": "a"}"#).unwrap();
        assert_eq!(camel.access_token, "a");
        assert_eq!(camel.refresh_token, None);
    }

    #[test]
    fn error_message_prefers_server_supplied_fields() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, r#"{"error": "Amount is required"}"#),
            "Amount is required"
        );
        assert_eq!(
            error_message(status, r#"{"message": "No such expense"}"#),
            "No such expense"
        );
        assert_eq!(error_message(status, "not json"), "HTTP 400 Bad Request");
        assert_eq!(error_message(status, "{}"), "HTTP 400 Bad Request");
    }

    #[test]
    fn dates_tolerate_timestamps_and_slashes() {
        assert_eq!(
            parse_date_any(Some("2025-09-16T12:30:00.000Z")).to_string(),
            "2025-09-16"
        );
        assert_eq!(parse_date_any(Some("2025/09/16")).to_string(), "2025-09-16");
        // Garbage and absence both fall back to today.
        let today = chrono::Local::now().date_naive();
        assert_eq!(parse_date_any(Some("soon")), today);
        assert_eq!(parse_date_any(None), today);
    }

    #[test]
    fn monthly_trends_unwrap_their_envelope() {
        let raw = r#"{"monthly_trends": [
            {"month": "2025-09", "salary": 60000, "total_expenses": 30000, "savings": 30000}
        ]}"#;
        let resp: MonthlyTrendsResponse = serde_json::from_str(raw).unwrap();
        let trends: Vec<MonthlyTrend> = resp
            .monthly_trends
            .into_iter()
            .map(MonthlyTrendDto::to_domain)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(trends[0].month, "2025-09");
        assert_eq!(trends[0].savings, "30000".parse().unwrap());
    }

    #[test]
    fn update_body_omits_absent_fields() {
        let body = UpdateExpenseBody {
            name: Some("groceries"),
            amount: None,
            category: None,
            date: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"name":"groceries"}"#
        );
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let backend = HttpBackend::new("http://localhost:5000/", TokenCell::new());
        assert_eq!(backend.url("/auth/login"), "http://localhost:5000/auth/login");
    }
}
