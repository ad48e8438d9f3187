//! PostgreSQL Store
//!
//! Units of work map one-to-one onto database transactions. Account rows are
//! locked with `SELECT ... FOR UPDATE`, which is the per-account
//! serialization point for transfers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};

use crate::domain::{
    Account, AccountId, Amount, Balance, NewTransaction, Transaction, TransactionId,
    TransactionStatus, User, UserId,
};

use super::{AccountStore, Store, StoreError, TransactionLedger, UnitOfWork};

type AccountRow = (i64, Decimal, DateTime<Utc>);

type UserRow = (i64, String, String, String, String, Option<i64>);

type TransactionRow = (
    i64,
    i64,
    i64,
    Decimal,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

const TRANSACTION_COLUMNS: &str = "id, sender_account_id, receiver_account_id, amount_of_money, \
     message, sender_first_name, sender_last_name, status, created_at, finished_at";

fn account_from_row((id, amount, created_at): AccountRow) -> Result<Account, StoreError> {
    let balance = Balance::new(amount)
        .map_err(|e| StoreError::Corrupt(format!("account {}: {}", id, e)))?;
    Ok(Account::new(id, balance, created_at))
}

fn user_from_row(
    (id, username, first_name, last_name, role, account_id): UserRow,
) -> User {
    User {
        id,
        username,
        first_name,
        last_name,
        role: role.into(),
        account_id,
    }
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction, StoreError> {
    let (
        id,
        sender_account_id,
        receiver_account_id,
        amount,
        message,
        sender_first_name,
        sender_last_name,
        status,
        created_at,
        finished_at,
    ) = row;

    let amount = Amount::new(amount)
        .map_err(|e| StoreError::Corrupt(format!("transaction {}: {}", id, e)))?;
    let status: TransactionStatus = status
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("transaction {}: {}", id, e)))?;

    Ok(Transaction {
        id,
        sender_account_id,
        receiver_account_id,
        amount,
        message,
        sender_first_name,
        sender_last_name,
        status,
        created_at,
        finished_at,
    })
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, first_name, last_name, role, account_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> =
            sqlx::query_as("SELECT id, amount_of_money, created_at FROM accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(account_from_row).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> =
            sqlx::query_as("SELECT id, amount_of_money, created_at FROM accounts ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions ORDER BY id DESC",
            TRANSACTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(transaction_from_row).collect()
    }
}

/// Unit of work over one database transaction.
///
/// Dropping it without `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: PgTransaction<'static, Postgres>,
}

impl PgUnitOfWork {
    async fn fetch_account(
        &mut self,
        account_id: AccountId,
        for_update: bool,
    ) -> Result<Option<Account>, StoreError> {
        let sql = if for_update {
            "SELECT id, amount_of_money, created_at FROM accounts WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, amount_of_money, created_at FROM accounts WHERE id = $1"
        };

        let row: Option<AccountRow> = sqlx::query_as(sql)
            .bind(account_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(account_from_row).transpose()
    }

    /// Move a PENDING row to `next`; the status guard lives in the WHERE clause
    async fn transition(
        &mut self,
        id: TransactionId,
        next: TransactionStatus,
    ) -> Result<Transaction, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE transactions
            SET status = $2, finished_at = clock_timestamp()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(next.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = row {
            return transaction_from_row(row);
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM transactions WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;

        match current {
            None => Err(StoreError::TransactionNotFound(id)),
            Some(status) => {
                let from = status
                    .parse()
                    .map_err(|e| StoreError::Corrupt(format!("transaction {}: {}", id, e)))?;
                Err(StoreError::InvalidStatusTransition { id, from, to: next })
            }
        }
    }
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    async fn get(&mut self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        self.fetch_account(account_id, false).await
    }

    async fn lock(&mut self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        self.fetch_account(account_id, true).await
    }

    async fn set_balance(
        &mut self,
        account_id: AccountId,
        balance: Balance,
    ) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET amount_of_money = $2
            WHERE id = $1
            RETURNING id, amount_of_money, created_at
            "#,
        )
        .bind(account_id)
        .bind(balance.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(account_from_row)
            .transpose()?
            .ok_or(StoreError::AccountNotFound(account_id))
    }

    async fn create(&mut self) -> Result<Account, StoreError> {
        let row: AccountRow = sqlx::query_as(
            "INSERT INTO accounts (amount_of_money) VALUES (0) RETURNING id, amount_of_money, created_at",
        )
        .fetch_one(&mut *self.tx)
        .await?;

        account_from_row(row)
    }

    async fn delete(&mut self, account_id: AccountId) -> Result<(), StoreError> {
        let rows_affected = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::AccountNotFound(account_id));
        }

        Ok(())
    }

    async fn lock_user(&mut self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, first_name, last_name, role, account_id
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn holder(&mut self, account_id: AccountId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, first_name, last_name, role, account_id
            FROM users
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn link(&mut self, user_id: UserId, account_id: AccountId) -> Result<User, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            UPDATE users
            SET account_id = $2
            WHERE id = $1
            RETURNING id, username, first_name, last_name, role, account_id
            "#,
        )
        .bind(user_id)
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(user_from_row)
            .ok_or(StoreError::UserNotFound(user_id))
    }

    async fn unlink(&mut self, account_id: AccountId) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET account_id = NULL WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TransactionLedger for PgUnitOfWork {
    async fn record_pending(&mut self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let row: TransactionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO transactions (
                sender_account_id, receiver_account_id, amount_of_money,
                message, sender_first_name, sender_last_name, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'PENDING')
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(new.sender_account_id)
        .bind(new.receiver_account_id)
        .bind(new.amount.value())
        .bind(new.message)
        .bind(new.sender_first_name)
        .bind(new.sender_last_name)
        .fetch_one(&mut *self.tx)
        .await?;

        transaction_from_row(row)
    }

    async fn mark_successful(&mut self, id: TransactionId) -> Result<Transaction, StoreError> {
        self.transition(id, TransactionStatus::Successful).await
    }

    async fn mark_failed(&mut self, id: TransactionId) -> Result<Transaction, StoreError> {
        self.transition(id, TransactionStatus::Failed).await
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
