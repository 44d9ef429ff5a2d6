use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageResponseData;
use crate::domain::report::models::Email;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn send_email(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<SendEmailRequest>,
) -> Result<ApiSuccess<MessageResponseData>, ApiError> {
    let email = Email::new(body.to, body.subject, body.body)?;

    state.mailer.send(&email).await?;
    tracing::info!(
        user_id = %user.user_id,
        recipients = email.to.len(),
        "Email dispatched on behalf of user"
    );

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageResponseData::new("Email sent"),
    ))
}

/// HTTP request body for sending an HTML email
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    to: Vec<String>,
    subject: String,
    body: String,
}
