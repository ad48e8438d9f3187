//! Domain module
//!
//! Core domain types and business rules.

pub mod account;
pub mod amount;
pub mod context;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId, NewUser, Role, User, UserId};
pub use amount::{Amount, AmountError, Balance};
pub use context::{Actor, OperationContext};
pub use error::{DomainError, RejectionReason};
pub use transaction::{NewTransaction, Transaction, TransactionId, TransactionStatus};
