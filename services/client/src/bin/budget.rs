//! services/client/src/bin/budget.rs
//!
//! The command-line consumer of the client core: wires the HTTP backend
//! and the two identity tiers into a `BudgetTracker` and maps subcommands
//! onto its operations. All rendering of outcomes to the user happens
//! here; the core only returns typed results.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use budget_core::{
    BudgetTracker, ExpenseId, ExpensePatch, Money, NewExpense, ReportFormat, TokenCell,
};
use client_lib::{
    adapters::{FileIdentityStore, HttpBackend, MemoryIdentityStore},
    config::Config,
    error::AppError,
};

#[derive(Parser)]
#[command(name = "budget", about = "Personal budget tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new account.
    Register { email: String, password: String },
    /// Log in and fetch the initial snapshot.
    Login {
        email: String,
        password: String,
        /// Keep the session across restarts (durable storage tier).
        #[arg(long)]
        remember: bool,
    },
    /// Clear the saved session. Client-local; the server is not called.
    Logout,
    /// Show salary, budget, expenses and all derived totals.
    Summary,
    /// Record a new expense.
    Add {
        name: String,
        amount: Money,
        #[arg(long)]
        category: Option<String>,
        /// Defaults to today (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Change fields of an existing expense.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        amount: Option<Money>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an expense by id.
    Delete { id: String },
    /// Set the monthly salary.
    Salary { amount: Money },
    /// Set the monthly budget limit.
    Budget { amount: Money },
    /// Clear salary, budget and all expenses.
    Reset,
    /// Show the server-computed monthly trend series.
    Trends,
    /// Download a report and save it next to the current directory.
    Export { format: ReportFormat },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 2. Wire the Adapters and the Core ---
    let token = TokenCell::new();
    let backend = Arc::new(HttpBackend::new(&config.api_base_url, token.clone()));
    let durable = Arc::new(FileIdentityStore::new(&config.state_dir));
    let ephemeral = Arc::new(MemoryIdentityStore::new());
    let app = BudgetTracker::new(
        backend,
        durable,
        ephemeral,
        token,
        config.categories.clone(),
    );

    let cli = Cli::parse();

    // Every command except register/login runs against a restored session.
    if !matches!(cli.command, Command::Register { .. } | Command::Login { .. }) {
        if let Some(session) = app.restore_session() {
            info!(email = session.email, "session restored");
        }
    }

    // --- 3. Dispatch ---
    match cli.command {
        Command::Register { email, password } => {
            app.register(&email, &password).await?;
            println!("Account created for {email}. You can now log in.");
        }
        Command::Login {
            email,
            password,
            remember,
        } => {
            app.login(&email, &password, remember).await?;
            println!("Logged in as {email}.");
        }
        Command::Logout => {
            app.logout();
            println!("Logged out.");
        }
        Command::Summary => {
            app.refresh().await?;
            print_summary(&app)?;
        }
        Command::Add {
            name,
            amount,
            category,
            date,
        } => {
            let record = app
                .add_expense(NewExpense {
                    name,
                    amount,
                    category,
                    date,
                })
                .await?;
            println!(
                "Added {} ({}) on {} [id {}]",
                record.name, record.amount, record.date, record.id
            );
        }
        Command::Update {
            id,
            name,
            amount,
            category,
            date,
        } => {
            let record = app
                .update_expense(
                    &ExpenseId(id),
                    ExpensePatch {
                        name,
                        amount,
                        category,
                        date,
                    },
                )
                .await?;
            println!("Updated {} -> {} ({})", record.id, record.name, record.amount);
        }
        Command::Delete { id } => {
            app.delete_expense(&ExpenseId(id)).await?;
            println!("Deleted.");
        }
        Command::Salary { amount } => {
            app.set_salary(amount).await?;
            println!("Salary set to {amount}.");
        }
        Command::Budget { amount } => {
            app.set_budget(amount).await?;
            println!("Budget set to {amount}.");
        }
        Command::Reset => {
            app.reset_all().await?;
            println!("Salary, budget and all expenses cleared.");
        }
        Command::Trends => {
            let trends = app.monthly_trends().await?;
            if trends.is_empty() {
                println!("No monthly data available.");
            }
            for t in trends {
                println!(
                    "{}: salary {}, spent {}, saved {}",
                    t.month, t.salary, t.total_expenses, t.savings
                );
            }
            let summary = app.trends_summary().await?;
            println!(
                "Overall: spent {} of {} salary, {} saved",
                summary.total_expenses, summary.salary, summary.savings
            );
        }
        Command::Export { format } => {
            let blob = app.download_report(format).await?;
            let file_name = format!(
                "expenses_{}.{}",
                chrono::Local::now().date_naive(),
                format.as_str()
            );
            std::fs::write(&file_name, blob)?;
            println!("Saved {file_name}.");
        }
    }

    Ok(())
}

fn print_summary(app: &BudgetTracker) -> Result<(), AppError> {
    let snapshot = app
        .snapshot()
        .ok_or_else(|| AppError::Usage("no data yet; log in first".into()))?;
    let view = app
        .derived()
        .ok_or_else(|| AppError::Usage("no data yet; log in first".into()))?;

    println!("Salary:         {}", snapshot.salary);
    println!("Budget limit:   {}", snapshot.budget_limit);
    println!("Total expenses: {}", view.total_expenses);
    println!("Balance:        {}", view.balance);
    if view.warnings.budget_exceeds_salary {
        println!("!! budget limit exceeds salary");
    }
    if view.warnings.balance_negative {
        println!("!! expenses exceed salary");
    }

    println!("\nBy category:");
    for (label, total) in &view.category_totals {
        println!("  {label:<14} {total}");
    }

    println!("\nBy month:");
    for (month, total) in &view.monthly_totals {
        println!("  {month}        {total}");
    }

    println!("\nExpenses:");
    for e in &snapshot.expenses {
        println!(
            "  [{}] {} {} {} ({})",
            e.id,
            e.date,
            e.name,
            e.amount,
            e.category.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
