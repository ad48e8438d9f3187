//! Store module
//!
//! Persistence ports for accounts and the transaction ledger, with a
//! PostgreSQL adapter and an in-memory adapter.
//!
//! All mutations go through a [`UnitOfWork`]: everything done on one unit of
//! work commits together or not at all. Dropping a unit of work without
//! committing rolls it back.

mod account_store;
mod error;
mod ledger;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Account, AccountId, Transaction, User, UserId};

pub use account_store::AccountStore;
pub use error::StoreError;
pub use ledger::TransactionLedger;
pub use memory::{FaultPoint, InMemoryStore};
pub use postgres::PgStore;

/// One transactional boundary over accounts and ledger
#[async_trait]
pub trait UnitOfWork: AccountStore + TransactionLedger {
    /// Make every change visible atomically
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every change
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Entry point to a persistence backend
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Resolve a user record (Authorization Context lookup)
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Read an account outside of any unit of work
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    /// All accounts, ordered by id
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// All ledger rows, newest first
    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError>;
}
