//! Transaction ledger records
//!
//! A transaction is the persisted record of one transfer attempt. Rows are
//! created PENDING and move exactly once to a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount};

/// Sequential transaction identifier (`transactions.id`)
pub type TransactionId = i64;

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Successful,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Successful => "SUCCESSFUL",
            TransactionStatus::Failed => "FAILED",
        }
    }

    /// PENDING -> SUCCESSFUL and PENDING -> FAILED are the only transitions
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Successful)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "SUCCESSFUL" => Ok(TransactionStatus::Successful),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    #[serde(rename = "amount_of_money")]
    pub amount: Amount,
    pub message: Option<String>,
    pub sender_first_name: Option<String>,
    pub sender_last_name: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn is_successful(&self) -> bool {
        self.status == TransactionStatus::Successful
    }
}

/// Data for appending a PENDING row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub amount: Amount,
    pub message: Option<String>,
    pub sender_first_name: Option<String>,
    pub sender_last_name: Option<String>,
}

impl NewTransaction {
    pub fn new(sender_account_id: AccountId, receiver_account_id: AccountId, amount: Amount) -> Self {
        Self {
            sender_account_id,
            receiver_account_id,
            amount,
            message: None,
            sender_first_name: None,
            sender_last_name: None,
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_sender_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.sender_first_name = Some(first_name.to_string());
        self.sender_last_name = Some(last_name.to_string());
        self
    }
}
