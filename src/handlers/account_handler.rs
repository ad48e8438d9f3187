//! Account Handler
//!
//! Opening, linking and closing accounts. Each operation runs in its own
//! unit of work.

use std::sync::Arc;

use crate::domain::{Account, AccountId, Actor, DomainError, OperationContext, Role};
use crate::error::AppError;
use crate::store::Store;

use super::{LinkAccountCommand, LinkAccountResult};

// =========================================================================
// AccountHandler
// =========================================================================

/// Handler for account lifecycle commands
pub struct AccountHandler {
    store: Arc<dyn Store>,
}

impl AccountHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open an account with a zero balance and link it to the actor.
    ///
    /// Users get one account; admins may open more, and their link moves to
    /// the newest one. The one-account check reads the locked user row.
    pub async fn create(
        &self,
        actor: &Actor,
        context: &OperationContext,
    ) -> Result<Account, AppError> {
        let mut uow = self.store.begin().await?;

        let user = match uow.lock_user(actor.user_id).await? {
            Some(user) => user,
            None => {
                uow.rollback().await?;
                return Err(AppError::UserNotFound(actor.user_id.to_string()));
            }
        };

        if user.account_id.is_some() && user.role != Role::Admin {
            uow.rollback().await?;
            tracing::info!(
                username = %user.username,
                correlation_id = ?context.correlation_id,
                "Account creation refused, user already has an account"
            );
            return Err(DomainError::UserAlreadyHasAccount.into());
        }

        let account = uow.create().await?;
        uow.link(actor.user_id, account.id).await?;
        uow.commit().await?;

        tracing::info!(
            account_id = account.id,
            username = %actor.username,
            correlation_id = ?context.correlation_id,
            "Account created and linked"
        );

        Ok(account)
    }

    /// Link the actor to an existing account nobody holds
    pub async fn link(
        &self,
        actor: &Actor,
        command: LinkAccountCommand,
        context: &OperationContext,
    ) -> Result<LinkAccountResult, AppError> {
        if command.user_id != actor.user_id {
            return Err(AppError::PermissionDenied);
        }

        let mut uow = self.store.begin().await?;

        let current = match uow.lock_user(actor.user_id).await? {
            Some(user) => user,
            None => {
                uow.rollback().await?;
                return Err(AppError::UserNotFound(actor.user_id.to_string()));
            }
        };

        if current.account_id == Some(command.account_id) {
            uow.rollback().await?;
            return Err(AppError::InvalidRequest(
                "Can't set account_id to the current account_id.".to_string(),
            ));
        }

        let available = match uow.lock(command.account_id).await? {
            Some(_) => uow.holder(command.account_id).await?.is_none(),
            None => false,
        };
        if !available {
            uow.rollback().await?;
            return Err(DomainError::AccountAlreadyLinked(command.account_id).into());
        }

        let user = uow.link(actor.user_id, command.account_id).await?;
        uow.commit().await?;

        tracing::info!(
            account_id = command.account_id,
            username = %user.username,
            correlation_id = ?context.correlation_id,
            "Account linked"
        );

        Ok(LinkAccountResult {
            account_id: command.account_id,
        })
    }

    /// Close an empty account. Ledger rows that mention it are kept.
    pub async fn delete(
        &self,
        actor: &Actor,
        account_id: AccountId,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        if !actor.can_access_account(account_id) {
            return Err(AppError::PermissionDenied);
        }

        let mut uow = self.store.begin().await?;

        let account = uow
            .lock(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        if !account.balance.is_zero() {
            uow.rollback().await?;
            return Err(DomainError::AccountNotEmpty(account_id).into());
        }

        uow.unlink(account_id).await?;
        uow.delete(account_id).await?;
        uow.commit().await?;

        tracing::info!(
            account_id,
            user_id = actor.user_id,
            correlation_id = ?context.correlation_id,
            "Account deleted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Balance, NewUser};
    use crate::store::InMemoryStore;
    use rust_decimal_macros::dec;

    fn handler(store: &InMemoryStore) -> AccountHandler {
        AccountHandler::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_create_links_new_account() {
        let store = InMemoryStore::new();
        let user = store.insert_user(NewUser::new("carol", "Carol", "Client")).await;
        let actor = Actor::from(user.clone());

        let account = handler(&store)
            .create(&actor, &OperationContext::new())
            .await
            .unwrap();

        assert!(account.balance.is_zero());
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.account_id, Some(account.id));
    }

    #[tokio::test]
    async fn test_create_refused_for_holder() {
        let store = InMemoryStore::new();
        let (user, _) = store
            .insert_account_holder(NewUser::new("dan", "Dan", "Doe"), Balance::zero())
            .await;

        let result = handler(&store)
            .create(&Actor::from(user), &OperationContext::new())
            .await;

        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::UserAlreadyHasAccount))
        ));
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_opens_one_account() {
        let store = InMemoryStore::new();
        let user = store.insert_user(NewUser::new("kim", "Kim", "Twice")).await;
        let actor = Actor::from(user.clone());

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let handler = handler(&store);
                let actor = actor.clone();
                tokio::spawn(async move { handler.create(&actor, &OperationContext::new()).await })
            })
            .collect();

        let mut created = Vec::new();
        let mut refused = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(account) => created.push(account),
                Err(AppError::Domain(DomainError::UserAlreadyHasAccount)) => refused += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(created.len(), 1);
        assert_eq!(refused, 1);
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.account_id, Some(created[0].id));
    }

    #[tokio::test]
    async fn test_create_refused_with_stale_actor() {
        let store = InMemoryStore::new();
        let user = store.insert_user(NewUser::new("lee", "Lee", "Late")).await;
        // Snapshot taken before the first account exists
        let stale = Actor::from(user.clone());

        handler(&store)
            .create(&stale, &OperationContext::new())
            .await
            .unwrap();
        let result = handler(&store).create(&stale, &OperationContext::new()).await;

        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::UserAlreadyHasAccount))
        ));
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_may_open_more_accounts() {
        let store = InMemoryStore::new();
        let (admin, first) = store
            .insert_account_holder(NewUser::new("root", "Ada", "Admin").admin(), Balance::zero())
            .await;

        let second = handler(&store)
            .create(&Actor::from(admin.clone()), &OperationContext::new())
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        let admin = store.find_user(admin.id).await.unwrap().unwrap();
        assert_eq!(admin.account_id, Some(second.id));
    }

    #[tokio::test]
    async fn test_link_rules() {
        let store = InMemoryStore::new();
        let (holder, taken) = store
            .insert_account_holder(NewUser::new("hal", "Hal", "Holder"), Balance::zero())
            .await;
        let user = store.insert_user(NewUser::new("una", "Una", "Linked")).await;
        let free = store.seed_account(Balance::zero()).await;
        let actor = Actor::from(user.clone());
        let ctx = OperationContext::new();
        let handler = handler(&store);

        // someone else's user id
        let result = handler
            .link(&actor, LinkAccountCommand::new(holder.id, free.id), &ctx)
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied)));

        // already linked to another user
        let result = handler
            .link(&actor, LinkAccountCommand::new(user.id, taken.id), &ctx)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::AccountAlreadyLinked(_)))
        ));

        // missing account
        let result = handler
            .link(&actor, LinkAccountCommand::new(user.id, 404), &ctx)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::AccountAlreadyLinked(404)))
        ));

        let linked = handler
            .link(&actor, LinkAccountCommand::new(user.id, free.id), &ctx)
            .await
            .unwrap();
        assert_eq!(linked.account_id, free.id);

        // same account again, even through the snapshot taken before linking
        let result = handler
            .link(&actor, LinkAccountCommand::new(user.id, free.id), &ctx)
            .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_requires_empty_balance() {
        let store = InMemoryStore::new();
        let (user, account) = store
            .insert_account_holder(
                NewUser::new("fay", "Fay", "Funds"),
                Balance::new(dec!(5)).unwrap(),
            )
            .await;
        let actor = Actor::from(user);

        let result = handler(&store)
            .delete(&actor, account.id, &OperationContext::new())
            .await;

        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::AccountNotEmpty(_)))
        ));
        assert!(store.get_account(account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_clears_link() {
        let store = InMemoryStore::new();
        let (user, account) = store
            .insert_account_holder(NewUser::new("gus", "Gus", "Gone"), Balance::zero())
            .await;

        handler(&store)
            .delete(&Actor::from(user.clone()), account.id, &OperationContext::new())
            .await
            .unwrap();

        assert!(store.get_account(account.id).await.unwrap().is_none());
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert!(user.account_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_other_users_account_denied() {
        let store = InMemoryStore::new();
        let (_, account) = store
            .insert_account_holder(NewUser::new("ivy", "Ivy", "Owner"), Balance::zero())
            .await;
        let stranger = store.insert_user(NewUser::new("joe", "Joe", "Stranger")).await;

        let result = handler(&store)
            .delete(&Actor::from(stranger), account.id, &OperationContext::new())
            .await;

        assert!(matches!(result, Err(AppError::PermissionDenied)));
    }
}
