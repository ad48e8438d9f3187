//! In-Memory Store
//!
//! Process-local store used by tests and demos. A unit of work holds the
//! store-wide lock for its whole lifetime, so units of work run one at a
//! time; changes are applied in place and reverted from an undo log when the
//! unit of work rolls back or is dropped.
//!
//! Do not call [`Store`] read methods while holding a unit of work on the
//! same task; they wait for the lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    Account, AccountId, Balance, NewTransaction, NewUser, Transaction, TransactionId,
    TransactionStatus, User, UserId,
};

use super::{AccountStore, Store, StoreError, TransactionLedger, UnitOfWork};

/// Where the next unit of work should fail. Faults fire once and clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// The nth (1-based) balance overwrite within one unit of work
    SetBalance(usize),
    /// Moving a ledger row to SUCCESSFUL
    MarkSuccessful,
    /// Committing the unit of work
    Commit,
}

#[derive(Debug)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    next_user_id: UserId,
    next_account_id: AccountId,
    next_transaction_id: TransactionId,
    fault: Option<FaultPoint>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            accounts: BTreeMap::new(),
            transactions: BTreeMap::new(),
            next_user_id: 1,
            next_account_id: 1,
            next_transaction_id: 1,
            fault: None,
        }
    }
}

impl MemoryState {
    fn insert_account(&mut self, balance: Balance) -> Account {
        let id = self.next_account_id;
        self.next_account_id += 1;

        let account = Account::new(id, balance, Utc::now());
        self.accounts.insert(id, account.clone());
        account
    }

    fn link_user(&mut self, user_id: UserId, account_id: AccountId) -> Result<User, StoreError> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))?;
        user.account_id = Some(account_id);
        Ok(user.clone())
    }

    /// Take the pending fault if `point` matches it
    fn trip(&mut self, point: FaultPoint) -> Result<(), StoreError> {
        if self.fault == Some(point) {
            self.fault = None;
            return Err(StoreError::Unavailable(format!("injected fault at {:?}", point)));
        }
        Ok(())
    }
}

/// Prior state of a record touched by a unit of work
#[derive(Debug)]
enum Undo {
    Account(AccountId, Option<Account>),
    User(User),
    Transaction(TransactionId, Option<Transaction>),
}

/// Store that keeps everything in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user without an account
    pub async fn insert_user(&self, new: NewUser) -> User {
        let mut state = self.state.lock().await;
        let id = state.next_user_id;
        state.next_user_id += 1;

        let user = User {
            id,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            role: new.role,
            account_id: None,
        };
        state.users.insert(id, user.clone());
        user
    }

    /// Create an unlinked account with an opening balance
    pub async fn seed_account(&self, balance: Balance) -> Account {
        self.state.lock().await.insert_account(balance)
    }

    /// Register a user and give them an account with an opening balance
    pub async fn insert_account_holder(&self, new: NewUser, balance: Balance) -> (User, Account) {
        let user = self.insert_user(new).await;

        let mut state = self.state.lock().await;
        let account = state.insert_account(balance);
        let user = match state.users.get_mut(&user.id) {
            Some(stored) => {
                stored.account_id = Some(account.id);
                stored.clone()
            }
            None => user,
        };
        (user, account)
    }

    /// Arm a fault for the next unit of work that reaches `point`
    pub async fn inject_fault(&self, point: FaultPoint) {
        self.state.lock().await.fault = Some(point);
    }

    /// Sum of all balances
    pub async fn total_balance(&self) -> Decimal {
        self.state
            .lock()
            .await
            .accounts
            .values()
            .map(|a| a.balance.value())
            .sum()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let state = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            state,
            undo: Vec::new(),
            balance_writes: 0,
            finished: false,
        }))
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.lock().await.accounts.get(&account_id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.state.lock().await.accounts.values().cloned().collect())
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .transactions
            .values()
            .rev()
            .cloned()
            .collect())
    }
}

/// Unit of work over the locked in-memory state
pub struct MemoryUnitOfWork {
    state: OwnedMutexGuard<MemoryState>,
    undo: Vec<Undo>,
    balance_writes: usize,
    finished: bool,
}

impl MemoryUnitOfWork {
    fn revert(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Account(id, Some(previous)) => {
                    self.state.accounts.insert(id, previous);
                }
                Undo::Account(id, None) => {
                    self.state.accounts.remove(&id);
                }
                Undo::User(previous) => {
                    self.state.users.insert(previous.id, previous);
                }
                Undo::Transaction(id, Some(previous)) => {
                    self.state.transactions.insert(id, previous);
                }
                Undo::Transaction(id, None) => {
                    self.state.transactions.remove(&id);
                }
            }
        }
    }

    fn transition(
        &mut self,
        id: TransactionId,
        next: TransactionStatus,
    ) -> Result<Transaction, StoreError> {
        let current = self
            .state
            .transactions
            .get(&id)
            .cloned()
            .ok_or(StoreError::TransactionNotFound(id))?;

        if !current.status.can_transition_to(next) {
            return Err(StoreError::InvalidStatusTransition {
                id,
                from: current.status,
                to: next,
            });
        }

        let mut updated = current.clone();
        updated.status = next;
        updated.finished_at = Some(Utc::now());

        self.undo.push(Undo::Transaction(id, Some(current)));
        self.state.transactions.insert(id, updated.clone());
        Ok(updated)
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            self.revert();
        }
    }
}

#[async_trait]
impl AccountStore for MemoryUnitOfWork {
    async fn get(&mut self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.accounts.get(&account_id).cloned())
    }

    async fn lock(&mut self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        // The unit of work already holds the store-wide lock
        Ok(self.state.accounts.get(&account_id).cloned())
    }

    async fn set_balance(
        &mut self,
        account_id: AccountId,
        balance: Balance,
    ) -> Result<Account, StoreError> {
        self.balance_writes += 1;
        let nth = self.balance_writes;
        self.state.trip(FaultPoint::SetBalance(nth))?;

        let previous = self
            .state
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(account_id))?;

        let mut updated = previous.clone();
        updated.balance = balance;

        self.undo.push(Undo::Account(account_id, Some(previous)));
        self.state.accounts.insert(account_id, updated.clone());
        Ok(updated)
    }

    async fn create(&mut self) -> Result<Account, StoreError> {
        let account = self.state.insert_account(Balance::zero());
        self.undo.push(Undo::Account(account.id, None));
        Ok(account)
    }

    async fn delete(&mut self, account_id: AccountId) -> Result<(), StoreError> {
        let previous = self
            .state
            .accounts
            .remove(&account_id)
            .ok_or(StoreError::AccountNotFound(account_id))?;
        self.undo.push(Undo::Account(account_id, Some(previous)));
        Ok(())
    }

    async fn lock_user(&mut self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.users.get(&user_id).cloned())
    }

    async fn holder(&mut self, account_id: AccountId) -> Result<Option<User>, StoreError> {
        Ok(self
            .state
            .users
            .values()
            .find(|u| u.account_id == Some(account_id))
            .cloned())
    }

    async fn link(&mut self, user_id: UserId, account_id: AccountId) -> Result<User, StoreError> {
        let previous = self
            .state
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::UserNotFound(user_id))?;

        let user = self.state.link_user(user_id, account_id)?;
        self.undo.push(Undo::User(previous));
        Ok(user)
    }

    async fn unlink(&mut self, account_id: AccountId) -> Result<(), StoreError> {
        let linked: Vec<User> = self
            .state
            .users
            .values()
            .filter(|u| u.account_id == Some(account_id))
            .cloned()
            .collect();

        for previous in linked {
            if let Some(user) = self.state.users.get_mut(&previous.id) {
                user.account_id = None;
            }
            self.undo.push(Undo::User(previous));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionLedger for MemoryUnitOfWork {
    async fn record_pending(&mut self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let id = self.state.next_transaction_id;
        self.state.next_transaction_id += 1;

        let transaction = Transaction {
            id,
            sender_account_id: new.sender_account_id,
            receiver_account_id: new.receiver_account_id,
            amount: new.amount,
            message: new.message,
            sender_first_name: new.sender_first_name,
            sender_last_name: new.sender_last_name,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            finished_at: None,
        };

        self.undo.push(Undo::Transaction(id, None));
        self.state.transactions.insert(id, transaction.clone());
        Ok(transaction)
    }

    async fn mark_successful(&mut self, id: TransactionId) -> Result<Transaction, StoreError> {
        self.state.trip(FaultPoint::MarkSuccessful)?;
        self.transition(id, TransactionStatus::Successful)
    }

    async fn mark_failed(&mut self, id: TransactionId) -> Result<Transaction, StoreError> {
        self.transition(id, TransactionStatus::Failed)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut uow = self;
        // On error the box drops unfinished and reverts
        uow.state.trip(FaultPoint::Commit)?;
        uow.finished = true;
        uow.undo.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut uow = self;
        uow.revert();
        uow.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Amount;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    fn balance(value: Decimal) -> Balance {
        Balance::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists_changes() {
        let store = InMemoryStore::new();
        let account = store.seed_account(balance(dec!(100))).await;

        let mut uow = store.begin().await.unwrap();
        assert_ok!(uow.set_balance(account.id, balance(dec!(60))).await);
        assert_ok!(uow.commit().await);

        let stored = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance.value(), dec!(60));
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = InMemoryStore::new();
        let account = store.seed_account(balance(dec!(100))).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.set_balance(account.id, balance(dec!(1))).await.unwrap();
            let created = uow.create().await.unwrap();
            assert!(uow.get(created.id).await.unwrap().is_some());
        }

        let accounts = store.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].balance.value(), dec!(100));
    }

    #[tokio::test]
    async fn test_rollback_restores_ledger_and_links() {
        let store = InMemoryStore::new();
        let (user, account) = store
            .insert_account_holder(NewUser::new("bob", "Bob", "Builder"), Balance::zero())
            .await;

        let mut uow = store.begin().await.unwrap();
        uow.unlink(account.id).await.unwrap();
        uow.delete(account.id).await.unwrap();
        let amount = Amount::new(dec!(5)).unwrap();
        uow.record_pending(NewTransaction::new(account.id, 99, amount))
            .await
            .unwrap();
        uow.rollback().await.unwrap();

        assert!(store.get_account(account.id).await.unwrap().is_some());
        assert!(store.list_transactions().await.unwrap().is_empty());
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.account_id, Some(account.id));
    }

    #[tokio::test]
    async fn test_set_balance_missing_account() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let result = uow.set_balance(42, Balance::zero()).await;
        assert!(matches!(result, Err(StoreError::AccountNotFound(42))));
    }

    #[tokio::test]
    async fn test_delete_missing_account() {
        let store = InMemoryStore::new();
        let account = store.seed_account(Balance::zero()).await;
        let mut uow = store.begin().await.unwrap();

        let result = uow.delete(42).await;
        assert!(matches!(result, Err(StoreError::AccountNotFound(42))));
        assert_ok!(uow.delete(account.id).await);
        assert!(matches!(
            uow.delete(account.id).await,
            Err(StoreError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_user_reads_uncommitted_link() {
        let store = InMemoryStore::new();
        let user = store.insert_user(NewUser::new("ned", "Ned", "New")).await;

        let mut uow = store.begin().await.unwrap();
        let account = uow.create().await.unwrap();
        uow.link(user.id, account.id).await.unwrap();

        let locked = uow.lock_user(user.id).await.unwrap().unwrap();
        assert_eq!(locked.account_id, Some(account.id));
        assert!(uow.lock_user(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fault_fires_once() {
        let store = InMemoryStore::new();
        let account = store.seed_account(balance(dec!(10))).await;
        store.inject_fault(FaultPoint::SetBalance(2)).await;

        let mut uow = store.begin().await.unwrap();
        uow.set_balance(account.id, balance(dec!(9))).await.unwrap();
        let second = uow.set_balance(account.id, balance(dec!(8))).await;
        assert!(matches!(second, Err(StoreError::Unavailable(_))));
        drop(uow);

        let mut uow = store.begin().await.unwrap();
        uow.set_balance(account.id, balance(dec!(9))).await.unwrap();
        uow.set_balance(account.id, balance(dec!(8))).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.total_balance().await, dec!(8));
    }

    #[tokio::test]
    async fn test_commit_fault_reverts() {
        let store = InMemoryStore::new();
        let account = store.seed_account(balance(dec!(10))).await;
        store.inject_fault(FaultPoint::Commit).await;

        let mut uow = store.begin().await.unwrap();
        uow.set_balance(account.id, balance(dec!(0))).await.unwrap();
        assert_err!(uow.commit().await);

        assert_eq!(store.total_balance().await, dec!(10));
    }

    #[tokio::test]
    async fn test_status_moves_once() {
        let store = InMemoryStore::new();
        let amount = Amount::new(dec!(1)).unwrap();

        let mut uow = store.begin().await.unwrap();
        let pending = uow
            .record_pending(NewTransaction::new(1, 2, amount))
            .await
            .unwrap();
        assert_eq!(pending.status, TransactionStatus::Pending);
        assert!(pending.finished_at.is_none());

        let done = assert_ok!(uow.mark_successful(pending.id).await);
        assert_eq!(done.status, TransactionStatus::Successful);
        assert!(done.finished_at.is_some());

        let again = uow.mark_successful(pending.id).await;
        assert!(matches!(
            again,
            Err(StoreError::InvalidStatusTransition {
                from: TransactionStatus::Successful,
                ..
            })
        ));
        assert_err!(uow.mark_failed(pending.id).await);
        assert!(matches!(
            uow.mark_failed(777).await,
            Err(StoreError::TransactionNotFound(777))
        ));
    }

    #[tokio::test]
    async fn test_transactions_newest_first() {
        let store = InMemoryStore::new();
        let amount = Amount::new(dec!(1)).unwrap();

        let mut uow = store.begin().await.unwrap();
        for _ in 0..3 {
            uow.record_pending(NewTransaction::new(1, 2, amount))
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();

        let ids: Vec<_> = store
            .list_transactions()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_holder_and_link() {
        let store = InMemoryStore::new();
        let user = store.insert_user(NewUser::new("eve", "Eve", "Example")).await;
        let account = store.seed_account(Balance::zero()).await;

        let mut uow = store.begin().await.unwrap();
        assert!(uow.holder(account.id).await.unwrap().is_none());
        uow.link(user.id, account.id).await.unwrap();
        let holder = uow.holder(account.id).await.unwrap().unwrap();
        assert_eq!(holder.id, user.id);
        assert!(matches!(
            uow.link(500, account.id).await,
            Err(StoreError::UserNotFound(500))
        ));
        uow.commit().await.unwrap();
    }
}
