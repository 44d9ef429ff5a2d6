use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::MessageResponseData;
use crate::inbound::http::cookies::clear_session_cookies;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<(HeaderMap, ApiSuccess<MessageResponseData>), ApiError> {
    state.auth_service.logout(&user.user_id).await?;

    let mut headers = HeaderMap::new();
    clear_session_cookies(&mut headers, state.settings.cookie_secure)?;

    Ok((
        headers,
        ApiSuccess::new(StatusCode::OK, MessageResponseData::new("Logged out")),
    ))
}
