use std::net::SocketAddr;
use std::time::Instant;

use axum::body::to_bytes;
use axum::body::Body;
use axum::body::HttpBody;
use axum::extract::ConnectInfo;
use axum::extract::MatchedPath;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use chrono::Utc;
use uuid::Uuid;

use super::handlers::ApiError;
use super::handlers::ErrorDetail;
use super::middleware::AuthenticatedUser;
use super::middleware::TraceId;
use crate::domain::httplog::models::loggable_headers;
use crate::domain::httplog::models::ErrorLog;
use crate::domain::httplog::models::IncomingRequestLog;
use crate::domain::httplog::models::LogBody;
use crate::domain::httplog::models::OutgoingResponseLog;
use crate::domain::httplog::models::RequestSnapshot;
use crate::domain::httplog::models::ResponseSnapshot;
use crate::domain::httplog::models::BODYLESS_METHODS;
use crate::inbound::http::router::AppState;

/// Middleware recording every exchange through the HTTP log service.
///
/// Request and response bodies are buffered only when their exact length is
/// known and fits `max_body_bytes`. Rows are written on a background task
/// after the response is built, so persistence never delays or fails the
/// request.
pub async fn log_http_exchange(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let settings = &state.settings.http_log;
    let endpoint = req.uri().path().to_string();

    if !settings.enabled || settings.skip_paths.iter().any(|path| path == &endpoint) {
        return next.run(req).await;
    }

    let started = Instant::now();
    let max_body_bytes = settings.max_body_bytes;
    let method = req.method().to_string();
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|trace_id| trace_id.0.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let event_name = format!(
        "{} {}",
        method,
        req.extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or(&endpoint)
    );
    let ip_address = client_ip(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
    );
    let user_agent = header_str(req.headers(), USER_AGENT.as_str());
    let query = req.uri().query().map(str::to_string);

    let (parts, body) = req.into_parts();
    let (body, request_body) = if BODYLESS_METHODS.contains(&method.as_str()) {
        (body, LogBody::Empty)
    } else {
        let content_type = header_str(&parts.headers, CONTENT_TYPE.as_str());
        match capture(content_type.as_deref(), body, max_body_bytes).await {
            Ok(captured) => captured,
            Err(e) => {
                return ApiError::BadRequest(format!("Failed to read request body: {}", e))
                    .into_response()
            }
        }
    };

    let incoming = IncomingRequestLog {
        id: Uuid::new_v4(),
        trace_id: trace_id.clone(),
        event_name: event_name.clone(),
        endpoint: endpoint.clone(),
        method: method.clone(),
        request: RequestSnapshot {
            query,
            headers: loggable_headers(
                parts
                    .headers
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_bytes())),
            ),
            body: request_body,
        },
        ip_address,
        user_agent,
        created_at: Utc::now(),
    };
    let request_id = incoming.id;

    let response = next.run(Request::from_parts(parts, body)).await;

    let status = response.status();
    let user_id = response
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.user_id.to_string());
    let error_detail = response
        .extensions()
        .get::<ErrorDetail>()
        .map(|detail| detail.0.clone());

    let (parts, body) = response.into_parts();
    let content_type = header_str(&parts.headers, CONTENT_TYPE.as_str());
    let (body, response_body) = match capture(content_type.as_deref(), body, max_body_bytes).await
    {
        Ok(captured) => captured,
        Err(e) => {
            tracing::error!(trace_id = %trace_id, error = %e, "Failed to buffer response body");
            return ApiError::InternalServerError(e.to_string()).into_response();
        }
    };

    let outgoing = OutgoingResponseLog {
        id: Uuid::new_v4(),
        trace_id: trace_id.clone(),
        request_id,
        event_name,
        endpoint,
        method,
        status_code: status.as_u16(),
        response: ResponseSnapshot {
            headers: loggable_headers(
                parts
                    .headers
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_bytes())),
            ),
            body: response_body,
        },
        user_id,
        latency_ms: started.elapsed().as_millis() as i64,
        created_at: Utc::now(),
    };

    let error = status.is_server_error().then(|| {
        let message = error_detail.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Server error")
                .to_string()
        });
        ErrorLog::new(trace_id, Some(request_id), status.as_u16(), message)
    });

    let http_log_service = state.http_log_service.clone();
    tokio::spawn(async move {
        http_log_service.log_incoming(incoming).await;
        http_log_service.log_outgoing(outgoing).await;
        if let Some(error) = error {
            http_log_service.log_error(error).await;
        }
    });

    Response::from_parts(parts, body)
}

/// Buffer a body when its exact length is known and fits the limit.
///
/// Bodies without an exact length, or larger than the limit, pass through
/// untouched and are logged as omitted.
async fn capture(
    content_type: Option<&str>,
    body: Body,
    max_body_bytes: usize,
) -> Result<(Body, LogBody), axum::Error> {
    match body.size_hint().exact() {
        Some(0) => Ok((body, LogBody::Empty)),
        Some(length) if length <= max_body_bytes as u64 => {
            let bytes = to_bytes(body, max_body_bytes).await?;
            let logged = LogBody::from_bytes(&bytes, content_type);
            Ok((Body::from(bytes), logged))
        }
        Some(length) => Ok((
            body,
            LogBody::omitted(format!(
                "body of {} bytes exceeds {} bytes",
                length, max_body_bytes
            )),
        )),
        None => Ok((body, LogBody::omitted("body length unknown"))),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// First `X-Forwarded-For` hop, else the peer address.
fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    forwarded_for(headers).or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

/// First hop of `X-Forwarded-For`, the original client.
pub(super) fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for").and_then(|value| {
        value
            .split(',')
            .next()
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .map(str::to_string)
    })
}
