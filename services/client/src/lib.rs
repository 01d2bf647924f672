pub mod adapters;
pub mod config;
pub mod error;

pub use adapters::{FileIdentityStore, HttpBackend, MemoryIdentityStore};
pub use config::Config;
pub use error::AppError;
