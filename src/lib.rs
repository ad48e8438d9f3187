//! minibank Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::{Config, LogFormat};
pub use error::{AppError, ErrorResponse};
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext};
pub use store::{InMemoryStore, PgStore, Store, StoreError};
