use axum::extract::State;
use axum::Extension;
use axum::http::HeaderMap;
use axum::http::StatusCode;

use super::login::TokenData;
use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::cookies::read_cookie;
use crate::inbound::http::cookies::set_session_cookies;
use crate::inbound::http::cookies::REFRESH_TOKEN_COOKIE;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

/// Rotate the caller's session: consumes the refresh cookie and re-sets both
/// cookies. The refresh token must belong to the authenticated user.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
) -> Result<(HeaderMap, ApiSuccess<TokenData>), ApiError> {
    let refresh_token = read_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".to_string()))?;

    let tokens = state
        .auth_service
        .refresh(&user.user_id, &refresh_token)
        .await?;

    let mut response_headers = HeaderMap::new();
    set_session_cookies(&mut response_headers, &tokens, state.settings.cookie_secure)?;

    Ok((
        response_headers,
        ApiSuccess::new(
            StatusCode::OK,
            TokenData {
                expires_in: tokens.access_expires_in,
            },
        ),
    ))
}
