//! Transfer Handler
//!
//! Moves money from the actor's account to another account. Validation and
//! the debit/credit/ledger sequence run inside one unit of work, so a
//! transfer either fully happens or leaves no trace on balances.

use std::sync::Arc;

use crate::domain::{
    Account, AccountId, Actor, Amount, Balance, DomainError, NewTransaction, OperationContext,
    RejectionReason, Transaction,
};
use crate::error::AppError;
use crate::store::{Store, StoreError, UnitOfWork};

use super::TransferCommand;

/// Result of running the four transfer checks against locked state
enum Check {
    Passed { sender: Account, receiver: Account },
    Rejected(RejectionReason),
}

// =========================================================================
// TransferHandler
// =========================================================================

/// Handler for money transfers
pub struct TransferHandler {
    store: Arc<dyn Store>,
}

impl TransferHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Execute the transfer command on behalf of `actor`.
    ///
    /// # Errors
    /// - `DomainError::InvalidAmount` if the amount does not parse
    /// - `DomainError::TransferRejected` if any check fails; nothing is written
    /// - `AppError::Store` if persistence fails after validation; the attempt
    ///   is recorded as FAILED on a best-effort basis
    pub async fn execute(
        &self,
        actor: &Actor,
        command: TransferCommand,
        context: &OperationContext,
    ) -> Result<Transaction, AppError> {
        let amount: Amount = command.amount.parse().map_err(DomainError::from)?;

        let Some(sender_id) = actor.account_id else {
            return Err(self.reject(actor, &command, RejectionReason::AccountsMissing, context));
        };

        let mut uow = self.store.begin().await?;

        let (sender, receiver) =
            match Self::check(uow.as_mut(), sender_id, &command, &amount).await {
                Ok(Check::Passed { sender, receiver }) => (sender, receiver),
                Ok(Check::Rejected(reason)) => {
                    uow.rollback().await?;
                    return Err(self.reject(actor, &command, reason, context));
                }
                Err(e) => {
                    Self::discard(uow).await;
                    return Err(e.into());
                }
            };

        let (sender_balance, receiver_balance) = match (
            sender.balance.debit(&amount),
            receiver.balance.credit(&amount),
        ) {
            (Ok(s), Ok(r)) => (s, r),
            (Err(e), _) | (_, Err(e)) => {
                uow.rollback().await?;
                return Err(DomainError::InvalidAmount(e).into());
            }
        };

        let new_transaction = NewTransaction::new(sender.id, receiver.id, amount)
            .with_message(command.message)
            .with_sender_name(&actor.first_name, &actor.last_name);

        let applied = Self::apply(
            uow.as_mut(),
            new_transaction.clone(),
            (sender.id, sender_balance),
            (receiver.id, receiver_balance),
        )
        .await;

        let outcome = match applied {
            Ok(transaction) => uow.commit().await.map(|()| transaction),
            Err(e) => {
                Self::discard(uow).await;
                Err(e)
            }
        };

        match outcome {
            Ok(transaction) => {
                tracing::info!(
                    transaction_id = transaction.id,
                    sender_account_id = transaction.sender_account_id,
                    receiver_account_id = transaction.receiver_account_id,
                    amount = %transaction.amount,
                    correlation_id = ?context.correlation_id,
                    "Transfer completed"
                );
                Ok(transaction)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    persistence_failure = e.is_persistence_failure(),
                    sender_account_id = sender.id,
                    receiver_account_id = receiver.id,
                    correlation_id = ?context.correlation_id,
                    "Transfer failed after validation"
                );
                self.record_failure(new_transaction).await;
                Err(e.into())
            }
        }
    }

    /// Lock both accounts in ascending id order, then run the checks in
    /// order; the first failure wins.
    async fn check(
        uow: &mut dyn UnitOfWork,
        sender_id: AccountId,
        command: &TransferCommand,
        amount: &Amount,
    ) -> Result<Check, StoreError> {
        let receiver_id = command.receiver_account_id;

        let (sender, receiver) = if sender_id == receiver_id {
            let account = uow.lock(sender_id).await?;
            (account.clone(), account)
        } else if sender_id < receiver_id {
            let sender = uow.lock(sender_id).await?;
            let receiver = uow.lock(receiver_id).await?;
            (sender, receiver)
        } else {
            let receiver = uow.lock(receiver_id).await?;
            let sender = uow.lock(sender_id).await?;
            (sender, receiver)
        };

        let (Some(sender), Some(receiver)) = (sender, receiver) else {
            return Ok(Check::Rejected(RejectionReason::AccountsMissing));
        };

        let name_matches = uow
            .holder(receiver.id)
            .await?
            .map_or(false, |holder| {
                holder.has_name(&command.receiver_first_name, &command.receiver_last_name)
            });
        if !name_matches {
            return Ok(Check::Rejected(RejectionReason::NameMismatch));
        }

        if sender.id == receiver.id {
            return Ok(Check::Rejected(RejectionReason::SelfTransfer));
        }

        if !sender.balance.is_sufficient_for(amount) {
            return Ok(Check::Rejected(RejectionReason::InsufficientFunds));
        }

        Ok(Check::Passed { sender, receiver })
    }

    /// Ledger row, debit, credit, status; commit is left to the caller
    async fn apply(
        uow: &mut dyn UnitOfWork,
        new_transaction: NewTransaction,
        (sender_id, sender_balance): (AccountId, Balance),
        (receiver_id, receiver_balance): (AccountId, Balance),
    ) -> Result<Transaction, StoreError> {
        let pending = uow.record_pending(new_transaction).await?;
        uow.set_balance(sender_id, sender_balance).await?;
        uow.set_balance(receiver_id, receiver_balance).await?;
        uow.mark_successful(pending.id).await
    }

    /// Record a post-validation failure as a FAILED row in a fresh unit of work
    async fn record_failure(&self, new_transaction: NewTransaction) {
        let recorded = async {
            let mut uow = self.store.begin().await?;
            let pending = uow.record_pending(new_transaction).await?;
            let failed = uow.mark_failed(pending.id).await?;
            uow.commit().await?;
            Ok::<_, StoreError>(failed)
        }
        .await;

        match recorded {
            Ok(failed) => {
                tracing::warn!(transaction_id = failed.id, "Transfer attempt recorded as FAILED");
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not record failed transfer attempt");
            }
        }
    }

    async fn discard(uow: Box<dyn UnitOfWork>) {
        if let Err(e) = uow.rollback().await {
            tracing::error!(error = %e, "Rollback failed");
        }
    }

    fn reject(
        &self,
        actor: &Actor,
        command: &TransferCommand,
        reason: RejectionReason,
        context: &OperationContext,
    ) -> AppError {
        tracing::warn!(
            user_id = actor.user_id,
            sender_account_id = ?actor.account_id,
            receiver_account_id = command.receiver_account_id,
            reason = %reason,
            correlation_id = ?context.correlation_id,
            "Transfer rejected"
        );
        DomainError::rejected(reason).into()
    }
}
