pub mod config;
pub mod db;
pub mod error;
pub mod google;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use error::{BudgetError, ConfigError};
pub use google::credentials::{CloudCredentials, CredentialLoader};
