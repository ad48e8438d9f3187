//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountId, Actor, OperationContext, Transaction, UserId};
use crate::error::AppError;
use crate::handlers::{
    AccountHandler, LinkAccountCommand, LinkAccountResult, TransferCommand, TransferHandler,
};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

/// Amount as sent by clients: a decimal string or a bare JSON number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl From<AmountInput> for String {
    fn from(input: AmountInput) -> Self {
        match input {
            AmountInput::Text(s) => s,
            AmountInput::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub receiver_account_id: AccountId,
    pub amount_of_money: AmountInput,
    pub receiver_first_name: String,
    pub receiver_last_name: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<TransferRequest> for TransferCommand {
    fn from(request: TransferRequest) -> Self {
        let command = TransferCommand::new(
            request.receiver_account_id,
            String::from(request.amount_of_money),
            request.receiver_first_name,
            request.receiver_last_name,
        );
        match request.message {
            Some(message) => command.with_message(message),
            None => command,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkAccountRequest {
    pub account_id: AccountId,
}

#[derive(Debug, Serialize)]
pub struct AccountsListResponse {
    pub accounts: Vec<Account>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TransactionsListResponse {
    pub transactions: Vec<Transaction>,
    pub total: usize,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:account_id",
            get(get_account).delete(delete_account),
        )
        .route("/users/:user_id/account", post(link_account))
        .route("/transactions", get(list_transactions).post(transfer))
}

fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

// =========================================================================
// GET /accounts
// =========================================================================

/// List all accounts (admin)
async fn list_accounts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<AccountsListResponse>, AppError> {
    require_admin(&actor)?;

    let accounts = state.store.list_accounts().await?;
    let total = accounts.len();

    Ok(Json(AccountsListResponse { accounts, total }))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open an account for the caller
async fn create_account(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<OperationContext>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let handler = AccountHandler::new(state.store);
    let account = handler.create(&actor, &context).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

// =========================================================================
// GET /accounts/:account_id
// =========================================================================

/// Get an account (owner or admin)
async fn get_account(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, AppError> {
    if !actor.can_access_account(account_id) {
        return Err(AppError::PermissionDenied);
    }

    let account = state
        .store
        .get_account(account_id)
        .await?
        .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

    Ok(Json(account))
}

// =========================================================================
// DELETE /accounts/:account_id
// =========================================================================

/// Close an empty account (owner or admin)
async fn delete_account(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<AccountId>,
) -> Result<StatusCode, AppError> {
    let handler = AccountHandler::new(state.store);
    handler.delete(&actor, account_id, &context).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// POST /users/:user_id/account
// =========================================================================

/// Link the caller to an existing unlinked account
async fn link_account(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<UserId>,
    Json(request): Json<LinkAccountRequest>,
) -> Result<Json<LinkAccountResult>, AppError> {
    let handler = AccountHandler::new(state.store);
    let command = LinkAccountCommand::new(user_id, request.account_id);

    let result = handler.link(&actor, command, &context).await?;

    Ok(Json(result))
}

// =========================================================================
// GET /transactions
// =========================================================================

/// List every ledger row, newest first (admin)
async fn list_transactions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<TransactionsListResponse>, AppError> {
    require_admin(&actor)?;

    let transactions = state.store.list_transactions().await?;
    let total = transactions.len();

    Ok(Json(TransactionsListResponse {
        transactions,
        total,
    }))
}

// =========================================================================
// POST /transactions
// =========================================================================

/// Transfer money from the caller's account
async fn transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let handler = TransferHandler::new(state.store);
    let transaction = handler.execute(&actor, request.into(), &context).await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}
