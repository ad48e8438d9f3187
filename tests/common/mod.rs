//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;

use minibank::api::{self, AppState};
use minibank::{db, InMemoryStore};

/// Full application router over an in-memory store
pub fn app(store: &InMemoryStore) -> Router {
    api::build_router(AppState::new(Arc::new(store.clone())))
}

/// Send one request and decode the JSON body (`Null` for empty bodies)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user_id: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("X-Request-User-Id", user_id.to_string());
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, json)
}

/// Setup test database - apply schema and truncate tables
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    db::apply_schema(&pool).await.expect("Failed to apply schema");

    sqlx::query("TRUNCATE TABLE transactions, users, accounts RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}

/// Insert an account holder directly, returning (user id, account id)
pub async fn seed_holder(
    pool: &PgPool,
    username: &str,
    first_name: &str,
    last_name: &str,
    balance: &str,
) -> (i64, i64) {
    let balance: rust_decimal::Decimal = balance.parse().unwrap();

    let account_id: i64 =
        sqlx::query_scalar("INSERT INTO accounts (amount_of_money) VALUES ($1) RETURNING id")
            .bind(balance)
            .fetch_one(pool)
            .await
            .expect("Failed to seed account");

    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, first_name, last_name, account_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(account_id)
    .fetch_one(pool)
    .await
    .expect("Failed to seed user");

    (user_id, account_id)
}
