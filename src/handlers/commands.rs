//! Command definitions
//!
//! Commands represent intentions to change the system state.

use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, UserId};

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move money from the actor's account to another account.
///
/// There is no sender field: the sender is always the actor's own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub receiver_account_id: AccountId,
    /// Amount to transfer (as string for precise decimal)
    pub amount: String,
    /// Must match the receiver's account holder exactly
    pub receiver_first_name: String,
    pub receiver_last_name: String,
    pub message: Option<String>,
}

impl TransferCommand {
    pub fn new(
        receiver_account_id: AccountId,
        amount: impl Into<String>,
        receiver_first_name: impl Into<String>,
        receiver_last_name: impl Into<String>,
    ) -> Self {
        Self {
            receiver_account_id,
            amount: amount.into(),
            receiver_first_name: receiver_first_name.into(),
            receiver_last_name: receiver_last_name.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// =========================================================================
// LinkAccountCommand
// =========================================================================

/// Command to point a user's account link at an existing, unlinked account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkAccountCommand {
    pub user_id: UserId,
    pub account_id: AccountId,
}

impl LinkAccountCommand {
    pub fn new(user_id: UserId, account_id: AccountId) -> Self {
        Self {
            user_id,
            account_id,
        }
    }
}

/// Result of a successful link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAccountResult {
    pub account_id: AccountId,
}
