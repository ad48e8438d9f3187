//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AccountId, AmountError, TransactionStatus};

/// Why a transfer failed validation.
///
/// Checks run in declaration order and the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Sender or receiver account does not exist
    AccountsMissing,

    /// Receiver's linked user does not carry the supplied names
    NameMismatch,

    /// Sender and receiver are the same account
    SelfTransfer,

    /// Sender balance is below the amount
    InsufficientFunds,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::AccountsMissing => write!(f, "Sender or receiver account not found"),
            RejectionReason::NameMismatch => write!(f, "Receiver name does not match"),
            RejectionReason::SelfTransfer => write!(f, "Cannot transfer to the same account"),
            RejectionReason::InsufficientFunds => write!(f, "Insufficient funds"),
        }
    }
}

/// Domain-specific errors
///
/// These represent business rule violations and are independent of the
/// web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Transfer failed validation. The message is deliberately generic; the
    /// reason is only for logs and callers inside the process.
    #[error("Failed transaction. Check the transaction's parameters.")]
    TransferRejected(RejectionReason),

    /// Amount could not be parsed or violates amount rules
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// Account still holds money
    #[error("Account {0} still has a non-zero balance")]
    AccountNotEmpty(AccountId),

    /// Account is already linked to a user
    #[error("Account either doesn't exist or is linked to another user.")]
    AccountAlreadyLinked(AccountId),

    /// User already has an account and may not open another
    #[error("User already has an account.")]
    UserAlreadyHasAccount,

    /// Ledger row is not in a state that allows the change
    #[error("Transaction cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
}

impl DomainError {
    pub fn rejected(reason: RejectionReason) -> Self {
        Self::TransferRejected(reason)
    }

    /// The validation reason, if this is a transfer rejection
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            Self::TransferRejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_hides_reason() {
        for reason in [
            RejectionReason::AccountsMissing,
            RejectionReason::NameMismatch,
            RejectionReason::SelfTransfer,
            RejectionReason::InsufficientFunds,
        ] {
            let err = DomainError::rejected(reason);
            assert_eq!(
                err.to_string(),
                "Failed transaction. Check the transaction's parameters."
            );
            assert_eq!(err.rejection_reason(), Some(reason));
        }
    }

    #[test]
    fn test_invalid_amount_from_amount_error() {
        let err: DomainError = AmountError::Overflow.into();
        assert!(err.rejection_reason().is_none());
        assert!(err.to_string().starts_with("Invalid amount"));
    }

    #[test]
    fn test_status_transition_message() {
        let err = DomainError::InvalidStatusTransition {
            from: TransactionStatus::Successful,
            to: TransactionStatus::Successful,
        };

        assert!(err.rejection_reason().is_none());
        assert!(err.to_string().contains("SUCCESSFUL"));
    }
}
