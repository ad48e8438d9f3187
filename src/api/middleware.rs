//! API Middleware
//!
//! Request context, actor resolution and request logging.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::{Actor, OperationContext, UserId};
use crate::error::AppError;

use super::AppState;

/// Header carrying the authenticated user id, set by the upstream gateway
pub const REQUEST_USER_HEADER: &str = "X-Request-User-Id";

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

// =========================================================================
// Operation context
// =========================================================================

/// Build the `OperationContext` for the request and echo the correlation id
/// back on the response
pub async fn context_middleware(mut request: Request<Body>, next: Next) -> Response {
    // Extract correlation ID or generate new one
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let mut context = OperationContext::new().with_correlation_id(correlation_id);
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        context = context.with_client_ip(addr.ip());
    }

    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

// =========================================================================
// Actor resolution
// =========================================================================

/// Resolve `X-Request-User-Id` to the caller's user record.
///
/// Missing header is 401, a non-numeric id is 400, an id with no user
/// behind it is 403.
pub async fn actor_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = parse_request_user(request.headers())?;

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Unknown user".to_string()))?;

    let mut context = request
        .extensions()
        .get::<OperationContext>()
        .cloned()
        .unwrap_or_default()
        .with_request_user(user_id);
    context.ensure_correlation_id();

    request.extensions_mut().insert(context);
    request.extensions_mut().insert(Actor::from(user));

    Ok(next.run(request).await)
}

fn parse_request_user(headers: &HeaderMap) -> Result<UserId, AppError> {
    let raw = headers.get(REQUEST_USER_HEADER).ok_or_else(|| {
        AppError::Unauthenticated(format!("Missing {} header", REQUEST_USER_HEADER))
    })?;

    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| {
            AppError::InvalidRequest(format!("Invalid {} header format", REQUEST_USER_HEADER))
        })
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .extensions()
        .get::<OperationContext>()
        .and_then(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
