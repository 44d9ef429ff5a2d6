use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenIssuer;
use chrono::DateTime;
use chrono::Utc;
use identity_service::config::HttpLogConfig;
use identity_service::config::RateLimitConfig;
use identity_service::domain::auth::service::AuthService;
use identity_service::domain::health::errors::HealthError;
use identity_service::domain::health::ports::HealthIndicator;
use identity_service::domain::health::service::HealthService;
use identity_service::domain::health::service::KeyValueStoreHealth;
use identity_service::domain::httplog::errors::HttpLogError;
use identity_service::domain::httplog::models::ErrorLog;
use identity_service::domain::httplog::models::IncomingRequestLog;
use identity_service::domain::httplog::models::OutgoingResponseLog;
use identity_service::domain::httplog::models::RequestLogs;
use identity_service::domain::httplog::ports::HttpLogRepository;
use identity_service::domain::httplog::service::HttpLogService;
use identity_service::domain::report::errors::MailError;
use identity_service::domain::report::models::Email;
use identity_service::domain::report::ports::Mailer;
use identity_service::domain::user::errors::UserError;
use identity_service::domain::user::models::EmailAddress;
use identity_service::domain::user::models::User;
use identity_service::domain::user::models::UserId;
use identity_service::domain::user::ports::UserRepository;
use identity_service::domain::user::service::UserService;
use identity_service::inbound::http::rate_limit::ClientRateLimiter;
use identity_service::inbound::http::router::create_router;
use identity_service::inbound::http::router::AppState;
use identity_service::inbound::http::router::HttpSettings;
use identity_service::outbound::cache::InMemoryKeyValueStore;
use tokio::sync::Mutex;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server over in-memory adapters
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub users: Arc<InMemoryUserRepository>,
    pub sessions: Arc<InMemoryKeyValueStore>,
    pub http_logs: Arc<InMemoryHttpLogRepository>,
    pub mailer: Arc<RecordingMailer>,
    pub token_issuer: Arc<TokenIssuer>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with_health(true).await
    }

    /// Spawn with the database check forced to `healthy`.
    pub async fn spawn_with_health(database_healthy: bool) -> Self {
        Self::spawn_with(database_healthy, None).await
    }

    /// Spawn with per-client throttling enabled.
    pub async fn spawn_with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        Self::spawn_with(true, Some(rate_limit)).await
    }

    async fn spawn_with(database_healthy: bool, rate_limit: Option<RateLimitConfig>) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let users = Arc::new(InMemoryUserRepository::default());
        let sessions = Arc::new(InMemoryKeyValueStore::new());
        let http_logs = Arc::new(InMemoryHttpLogRepository::default());
        let mailer = Arc::new(RecordingMailer::default());
        let token_issuer = Arc::new(TokenIssuer::new(
            JWT_SECRET,
            "identity-service",
            chrono::Duration::minutes(15),
        ));

        let auth_service = AuthService::new(
            Arc::clone(&users),
            Arc::clone(&sessions),
            Arc::clone(&token_issuer),
            Duration::from_secs(7 * 24 * 3600),
        )
        .with_password_hasher(PasswordHasher::with_cost(1024, 1, 1).unwrap());
        let user_service = UserService::new(
            Arc::clone(&users),
            Arc::clone(&sessions),
            Duration::from_secs(300),
        );
        let health_service = HealthService::new(
            Arc::new(StaticHealth(database_healthy)),
            Arc::new(KeyValueStoreHealth::new(Arc::clone(&sessions))),
            "test",
        );

        let state = AppState {
            auth_service: Arc::new(auth_service),
            user_service: Arc::new(user_service),
            health_service: Arc::new(health_service),
            http_log_service: Arc::new(HttpLogService::new(Arc::clone(&http_logs))),
            mailer: mailer.clone(),
            token_issuer: Arc::clone(&token_issuer),
            rate_limiter: rate_limit.map(|config| {
                Arc::new(ClientRateLimiter::new(&config).expect("Invalid rate limit"))
            }),
            settings: HttpSettings {
                cookie_secure: false,
                request_timeout: Duration::from_secs(10),
                http_log: HttpLogConfig::default(),
            },
        };

        let router = create_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
            users,
            sessions,
            http_logs,
            mailer,
            token_issuer,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Register a user and return its id.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .post("/api/v1/auth/register")
            .json(&serde_json::json!({
                "name": name,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Log in through the shared cookie jar.
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/auth/login")
            .json(&serde_json::json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// A second client with its own cookie jar.
    pub fn fresh_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create reqwest client")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Wait for the background HTTP log writer to record `trace_id`.
    pub async fn wait_for_logs(&self, trace_id: &str) -> RequestLogs {
        for _ in 0..50 {
            let logs = self.http_logs.find_by_trace_id(trace_id).await.unwrap();
            if !logs.outgoing_responses.is_empty() {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("No logs recorded for trace id {}", trace_id);
    }
}

/// Extract `name=value` from the response's `Set-Cookie` headers.
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}

/// Full `Set-Cookie` header for `name`.
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub async fn count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|existing| existing.deleted_at.is_none() && existing.email == user.email)
        {
            return Err(UserError::EmailAlreadyExists(
                user.email.as_str().to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .lock()
            .await
            .get(id)
            .filter(|user| user.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.deleted_at.is_none() && &user.email == email)
            .cloned())
    }

    async fn count_active(&self) -> Result<i64, UserError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .filter(|user| user.deleted_at.is_none())
            .count() as i64)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, UserError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .filter(|user| user.deleted_at.is_none() && user.created_at >= since)
            .count() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryHttpLogRepository {
    logs: Mutex<RequestLogs>,
}

#[async_trait]
impl HttpLogRepository for InMemoryHttpLogRepository {
    async fn save_incoming(&self, log: &IncomingRequestLog) -> Result<(), HttpLogError> {
        self.logs.lock().await.incoming_requests.push(log.clone());
        Ok(())
    }

    async fn save_outgoing(&self, log: &OutgoingResponseLog) -> Result<(), HttpLogError> {
        self.logs.lock().await.outgoing_responses.push(log.clone());
        Ok(())
    }

    async fn save_error(&self, log: &ErrorLog) -> Result<(), HttpLogError> {
        self.logs.lock().await.errors.push(log.clone());
        Ok(())
    }

    async fn find_by_trace_id(&self, trace_id: &str) -> Result<RequestLogs, HttpLogError> {
        let logs = self.logs.lock().await;
        Ok(RequestLogs {
            incoming_requests: logs
                .incoming_requests
                .iter()
                .filter(|log| log.trace_id == trace_id)
                .cloned()
                .collect(),
            outgoing_responses: logs
                .outgoing_responses
                .iter()
                .filter(|log| log.trace_id == trace_id)
                .cloned()
                .collect(),
            errors: logs
                .errors
                .iter()
                .filter(|log| log.trace_id == trace_id)
                .cloned()
                .collect(),
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, HttpLogError> {
        let mut logs = self.logs.lock().await;
        let before = logs.incoming_requests.len()
            + logs.outgoing_responses.len()
            + logs.errors.len();
        logs.incoming_requests.retain(|log| log.created_at >= cutoff);
        logs.outgoing_responses.retain(|log| log.created_at >= cutoff);
        logs.errors.retain(|log| log.created_at >= cutoff);
        let after = logs.incoming_requests.len()
            + logs.outgoing_responses.len()
            + logs.errors.len();
        Ok((before - after) as u64)
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

struct StaticHealth(bool);

#[async_trait]
impl HealthIndicator for StaticHealth {
    async fn check(&self) -> Result<(), HealthError> {
        if self.0 {
            Ok(())
        } else {
            Err(HealthError::Unavailable("database unreachable".to_string()))
        }
    }
}
