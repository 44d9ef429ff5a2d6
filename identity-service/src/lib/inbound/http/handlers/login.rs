use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::LoginResult;
use crate::inbound::http::cookies::set_session_cookies;
use crate::inbound::http::router::AppState;

/// Tokens travel only in `HttpOnly` cookies, never in the body.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, ApiSuccess<LoginResponseData>), ApiError> {
    let result = state
        .auth_service
        .login(LoginCommand {
            email: body.email,
            password: body.password,
        })
        .await?;

    let mut headers = HeaderMap::new();
    set_session_cookies(&mut headers, &result.tokens, state.settings.cookie_secure)?;

    Ok((headers, ApiSuccess::new(StatusCode::OK, (&result).into())))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub user: LoginUserData,
    pub token: TokenData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginUserData {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub expires_in: i64,
}

impl From<&LoginResult> for LoginResponseData {
    fn from(result: &LoginResult) -> Self {
        Self {
            user: LoginUserData {
                id: result.user.id.clone(),
                name: result.user.name.clone(),
                email: result.user.email.clone(),
            },
            token: TokenData {
                expires_in: result.tokens.access_expires_in,
            },
        }
    }
}
