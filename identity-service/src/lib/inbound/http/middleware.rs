use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use super::cookies::read_cookie;
use super::cookies::ACCESS_TOKEN_COOKIE;
use super::handlers::ApiError;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Authenticated caller, stored in request and response extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Correlation id of the current request.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

/// Middleware that validates the access token and adds the caller to request extensions.
///
/// Reads the `access_token` cookie, falling back to `Authorization: Bearer`.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_access_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing access token".to_string()))?;

    let subject = state
        .token_issuer
        .validate_access_token(&token)
        .map_err(|e| {
            tracing::warn!(error = %e, "Access token rejected");
            match e {
                auth::TokenError::Expired => {
                    ApiError::Unauthorized("Access token expired".to_string())
                }
                _ => ApiError::Unauthorized("Invalid access token".to_string()),
            }
        })?;

    let user_id = UserId::from_string(&subject).map_err(|e| {
        tracing::error!(error = %e, "Access token subject is not a user id");
        ApiError::Unauthorized("Invalid access token".to_string())
    })?;

    let user = AuthenticatedUser { user_id };
    req.extensions_mut().insert(user.clone());

    let mut response = next.run(req).await;
    response.extensions_mut().insert(user);

    Ok(response)
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = read_cookie(headers, ACCESS_TOKEN_COOKIE) {
        return Some(token);
    }

    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Reuse the caller's `X-Trace-ID` or mint one, and echo it on the response.
pub async fn propagate_trace_id(mut req: Request, next: Next) -> Response {
    let trace_id = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }

    response
}
