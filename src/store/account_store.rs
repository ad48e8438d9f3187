//! Account Store contract
//!
//! Sole owner of balance mutation. Callers compute new balances and ask the
//! store to overwrite them; the store never does arithmetic.

use async_trait::async_trait;

use crate::domain::{Account, AccountId, Balance, User, UserId};

use super::StoreError;

/// Account operations available inside a unit of work
#[async_trait]
pub trait AccountStore: Send {
    /// Read current state
    async fn get(&mut self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Read current state and hold the account's serialization point until
    /// the unit of work ends
    async fn lock(&mut self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Unconditional balance overwrite
    ///
    /// # Errors
    /// `StoreError::AccountNotFound` if the account does not exist
    async fn set_balance(
        &mut self,
        account_id: AccountId,
        balance: Balance,
    ) -> Result<Account, StoreError>;

    /// Create an account with zero balance
    async fn create(&mut self) -> Result<Account, StoreError>;

    /// Remove an account. No balance or link checks happen here.
    ///
    /// # Errors
    /// `StoreError::AccountNotFound` if the account does not exist
    async fn delete(&mut self, account_id: AccountId) -> Result<(), StoreError>;

    /// Read a user row and hold it until the unit of work ends. Decisions
    /// about a user's account link are made against this row.
    async fn lock_user(&mut self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// The user currently linked to the account, if any
    async fn holder(&mut self, account_id: AccountId) -> Result<Option<User>, StoreError>;

    /// Point the user's account link at `account_id`
    ///
    /// # Errors
    /// `StoreError::UserNotFound` if the user does not exist
    async fn link(&mut self, user_id: UserId, account_id: AccountId) -> Result<User, StoreError>;

    /// Clear any user link pointing at the account
    async fn unlink(&mut self, account_id: AccountId) -> Result<(), StoreError>;
}
