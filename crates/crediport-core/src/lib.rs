//! Core types shared across the crediport workspace: configuration,
//! the unified application error, and the account model.

pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, RouteBudget, RouteBudgets};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Role, UserAccount};
