//! Transaction Ledger contract
//!
//! Append/update only. Rows are never deleted and amount, sender and
//! receiver never change after insert.

use async_trait::async_trait;

use crate::domain::{NewTransaction, Transaction, TransactionId};

use super::StoreError;

/// Ledger operations available inside a unit of work
#[async_trait]
pub trait TransactionLedger: Send {
    /// Append a PENDING row
    async fn record_pending(&mut self, new: NewTransaction) -> Result<Transaction, StoreError>;

    /// PENDING -> SUCCESSFUL, stamps `finished_at`
    ///
    /// # Errors
    /// - `StoreError::TransactionNotFound` if the row does not exist
    /// - `StoreError::InvalidStatusTransition` if the row is already terminal
    async fn mark_successful(&mut self, id: TransactionId) -> Result<Transaction, StoreError>;

    /// PENDING -> FAILED, stamps `finished_at`
    ///
    /// # Errors
    /// Same as [`TransactionLedger::mark_successful`]
    async fn mark_failed(&mut self, id: TransactionId) -> Result<Transaction, StoreError>;
}
