use axum::extract::State;
use axum::http::StatusCode;

use super::ApiSuccess;
use super::MessageResponseData;
use crate::domain::health::models::HealthReport;
use crate::inbound::http::router::AppState;

/// 200 when every dependency answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> ApiSuccess<HealthReport> {
    let report = state.health_service.check().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    ApiSuccess::new(status, report)
}

pub async fn ping() -> ApiSuccess<MessageResponseData> {
    ApiSuccess::new(StatusCode::OK, MessageResponseData::new("pong"))
}
