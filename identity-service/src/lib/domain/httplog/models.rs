use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Headers never written to the log.
pub const REDACTED_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

/// JSON fields whose values are masked wherever they appear in a body.
pub const REDACTED_FIELDS: [&str; 4] = ["password", "refresh_token", "access_token", "token"];

/// Replacement written in place of a redacted value.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Methods whose request bodies are not captured.
pub const BODYLESS_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

/// Captured message body.
///
/// JSON is kept structured only when the content type says JSON and the
/// bytes parse, with [`REDACTED_FIELDS`] masked at any depth. A JSON body
/// that fails to parse is omitted, since its secrets cannot be located.
/// Anything else that is not UTF-8 is stored base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogBody {
    Json { value: serde_json::Value },
    Text { value: String },
    Binary { encoding: String, data: String },
    Omitted { reason: String },
    Empty,
}

impl LogBody {
    pub fn from_bytes(bytes: &[u8], content_type: Option<&str>) -> Self {
        if bytes.is_empty() {
            return LogBody::Empty;
        }

        if content_type.is_some_and(is_json_content_type) {
            return match serde_json::from_slice(bytes) {
                Ok(mut value) => {
                    redact_fields(&mut value);
                    LogBody::Json { value }
                }
                Err(_) => LogBody::omitted("malformed json"),
            };
        }

        match std::str::from_utf8(bytes) {
            Ok(text) if content_type.is_some_and(is_form_content_type) => LogBody::Text {
                value: redact_form_fields(text),
            },
            Ok(text) => LogBody::Text {
                value: text.to_string(),
            },
            Err(_) => LogBody::Binary {
                encoding: "base64".to_string(),
                data: STANDARD.encode(bytes),
            },
        }
    }

    pub fn omitted(reason: impl Into<String>) -> Self {
        LogBody::Omitted {
            reason: reason.into(),
        }
    }
}

fn redact_fields(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(fields) => {
            for (name, field) in fields.iter_mut() {
                if REDACTED_FIELDS
                    .iter()
                    .any(|redacted| name.eq_ignore_ascii_case(redacted))
                {
                    *field = serde_json::Value::String(REDACTED_VALUE.to_string());
                } else {
                    redact_fields(field);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_fields),
        _ => {}
    }
}

fn redact_form_fields(text: &str) -> String {
    text.split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _))
                if REDACTED_FIELDS
                    .iter()
                    .any(|redacted| name.eq_ignore_ascii_case(redacted)) =>
            {
                format!("{}={}", name, REDACTED_VALUE)
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .eq_ignore_ascii_case("application/x-www-form-urlencoded")
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || mime.ends_with("+json")
}

/// Request as received, minus credential headers and secret body fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: LogBody,
}

/// Response as sent, minus credential headers and secret body fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub headers: BTreeMap<String, String>,
    pub body: LogBody,
}

/// One row per inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingRequestLog {
    pub id: Uuid,
    pub trace_id: String,
    /// `METHOD /matched/route`, falls back to the raw path
    pub event_name: String,
    pub endpoint: String,
    pub method: String,
    pub request: RequestSnapshot,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row per response, linked to its request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingResponseLog {
    pub id: Uuid,
    pub trace_id: String,
    pub request_id: Uuid,
    pub event_name: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response: ResponseSnapshot,
    pub user_id: Option<String>,
    pub latency_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Server-side failure attached to a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLog {
    pub id: Uuid,
    pub trace_id: String,
    pub request_id: Option<Uuid>,
    pub status_code: u16,
    pub error: String,
    pub created_at: DateTime<Utc>,
}

impl ErrorLog {
    pub fn new(
        trace_id: impl Into<String>,
        request_id: Option<Uuid>,
        status_code: u16,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trace_id: trace_id.into(),
            request_id,
            status_code,
            error: error.into(),
            created_at: Utc::now(),
        }
    }
}

/// Everything recorded under one trace id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestLogs {
    pub incoming_requests: Vec<IncomingRequestLog>,
    pub outgoing_responses: Vec<OutgoingResponseLog>,
    pub errors: Vec<ErrorLog>,
}

/// Copy headers into a loggable map, dropping credentials and non-UTF-8 values.
pub fn loggable_headers<'a, I>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    headers
        .into_iter()
        .filter(|(name, _)| {
            !REDACTED_HEADERS
                .iter()
                .any(|redacted| name.eq_ignore_ascii_case(redacted))
        })
        .filter_map(|(name, value)| {
            std::str::from_utf8(value)
                .ok()
                .map(|value| (name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}
