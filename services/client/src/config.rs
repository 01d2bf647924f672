//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. The category label set is configuration
//! on purpose: the recognized labels vary per deployment and the core folds
//! anything unrecognized into the default label.

use budget_core::CategorySet;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

const DEFAULT_CATEGORIES: &str = "Fuel,Shopping,Travel,Hotel,Groceries,Miscellaneous";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub log_level: Level,
    pub categories: CategorySet,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("BUDGET_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());
        if api_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "BUDGET_API_URL".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let state_dir = std::env::var("BUDGET_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".budget-tracker"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let categories_raw =
            std::env::var("BUDGET_CATEGORIES").unwrap_or_else(|_| DEFAULT_CATEGORIES.to_string());
        let default_category = std::env::var("BUDGET_DEFAULT_CATEGORY")
            .unwrap_or_else(|_| "Miscellaneous".to_string());
        let categories = parse_categories(&categories_raw, &default_category).ok_or_else(|| {
            ConfigError::InvalidValue(
                "BUDGET_CATEGORIES".to_string(),
                "must contain at least one label".to_string(),
            )
        })?;

        Ok(Self {
            api_base_url,
            state_dir,
            log_level,
            categories,
        })
    }
}

/// Splits a comma-separated label list into a category set. Returns `None`
/// when no non-empty label survives trimming.
fn parse_categories(raw: &str, default_label: &str) -> Option<CategorySet> {
    let labels: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if labels.is_empty() || default_label.trim().is_empty() {
        return None;
    }
    Some(CategorySet::new(labels, default_label.trim()))
}
