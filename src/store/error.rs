//! Store Errors
//!
//! Error types for account store and ledger operations.

use crate::domain::{AccountId, TransactionId, TransactionStatus, UserId};

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// User does not exist
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Ledger row does not exist
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Ledger row is already terminal
    #[error("Transaction {id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store cannot serve the request (injected faults, closed pools)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored row violates a domain invariant
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Check if this error is infrastructure rather than data
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Database(_) | StoreError::Unavailable(_) | StoreError::Corrupt(_)
        )
    }
}
