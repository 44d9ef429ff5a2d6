use std::env;
use std::time::Duration;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::httplog::service::MAX_RETENTION_DAYS;

const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 24 * 60;
const MAX_REFRESH_TOKEN_TTL_HOURS: i64 = 365 * 24;

/// Application configuration for identity-service.
///
/// Loaded from configuration files with environment variable overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub http_log: HttpLogConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// HTTP server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Adds `Secure` to auth cookies. Enable behind HTTPS.
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// PostgreSQL database configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Redis configuration (session store and cache).
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// JWT and refresh token configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_token_ttl_minutes")]
    pub access_token_ttl_minutes: i64,
    #[serde(default = "default_refresh_token_ttl_hours")]
    pub refresh_token_ttl_hours: i64,
}

/// Read-through cache configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_user_ttl_seconds")]
    pub user_ttl_seconds: u64,
}

/// SMTP configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    pub from: String,
}

/// Daily report job configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Six-field cron expression (seconds first).
    #[serde(default = "default_report_schedule")]
    pub schedule: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Request/response logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_skip_paths")]
    pub skip_paths: Vec<String>,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_cleanup_schedule")]
    pub cleanup_schedule: String,
}

/// Per-client request throttling.
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Sustained rate each client is allowed.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Requests a client may send at once before the sustained rate applies.
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    /// Key clients by the first `X-Forwarded-For` hop instead of the peer
    /// address. Only safe behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
    /// Six-field cron expression for pruning idle client buckets.
    #[serde(default = "default_rate_limit_cleanup_schedule")]
    pub cleanup_schedule: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_ttl_seconds: default_user_ttl_seconds(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schedule: default_report_schedule(),
            recipients: Vec::new(),
        }
    }
}

impl Default for HttpLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_bytes: default_max_body_bytes(),
            skip_paths: default_skip_paths(),
            retention_days: default_retention_days(),
            cleanup_schedule: default_cleanup_schedule(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: default_requests_per_minute(),
            burst_size: default_burst_size(),
            trust_forwarded_for: false,
            cleanup_schedule: default_rate_limit_cleanup_schedule(),
        }
    }
}

impl JwtConfig {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.access_token_ttl_minutes
                .clamp(0, MAX_ACCESS_TOKEN_TTL_MINUTES),
        )
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        let hours = self
            .refresh_token_ttl_hours
            .clamp(0, MAX_REFRESH_TOKEN_TTL_HOURS) as u64;
        Duration::from_secs(hours * 3600)
    }
}

impl CacheConfig {
    pub fn user_ttl(&self) -> Duration {
        Duration::from_secs(self.user_ttl_seconds)
    }
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    5
}

fn default_issuer() -> String {
    "identity-service".to_string()
}

fn default_access_token_ttl_minutes() -> i64 {
    15
}

fn default_refresh_token_ttl_hours() -> i64 {
    168
}

fn default_user_ttl_seconds() -> u64 {
    300
}

fn default_smtp_port() -> u16 {
    587
}

fn default_report_schedule() -> String {
    "0 0 8 * * *".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_skip_paths() -> Vec<String> {
    vec!["/api/v1/health".to_string()]
}

fn default_retention_days() -> i64 {
    30
}

fn default_cleanup_schedule() -> String {
    "0 0 3 * * *".to_string()
}

fn default_requests_per_minute() -> u32 {
    100
}

fn default_burst_size() -> u32 {
    20
}

fn default_rate_limit_cleanup_schedule() -> String {
    "0 * * * * *".to_string()
}

fn check_range(key: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Message(format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        )))
    }
}

fn check_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::Message(format!("{} must be greater than 0", key)))
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides.
    ///
    /// # Configuration Priority (highest to lowest)
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{RUN_MODE}.toml)
    /// 3. Default config file (config/default.toml)
    ///
    /// # Errors
    /// * `ConfigError` - A source failed to parse, a required key is missing
    ///   or a value is out of range
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: REDIS__URL=redis://... overrides redis.url
            .add_source(
                Environment::with_prefix("")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("report.recipients")
                    .with_list_parse_key("http_log.skip_paths")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject durations and limits that would overflow or disable a feature
    /// by accident.
    ///
    /// # Errors
    /// * `ConfigError::Message` - Names the first offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("server.request_timeout_secs", self.server.request_timeout_secs)?;
        check_range(
            "jwt.access_token_ttl_minutes",
            self.jwt.access_token_ttl_minutes,
            1,
            MAX_ACCESS_TOKEN_TTL_MINUTES,
        )?;
        check_range(
            "jwt.refresh_token_ttl_hours",
            self.jwt.refresh_token_ttl_hours,
            1,
            MAX_REFRESH_TOKEN_TTL_HOURS,
        )?;
        check_positive("cache.user_ttl_seconds", self.cache.user_ttl_seconds)?;
        check_range(
            "http_log.retention_days",
            self.http_log.retention_days,
            1,
            MAX_RETENTION_DAYS,
        )?;
        if self.rate_limit.enabled {
            check_positive(
                "rate_limit.requests_per_minute",
                u64::from(self.rate_limit.requests_per_minute),
            )?;
            check_positive("rate_limit.burst_size", u64::from(self.rate_limit.burst_size))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use config::Value;

    use super::*;

    fn load_with(overrides: Vec<(&str, Value)>) -> Result<Config, ConfigError> {
        let mut builder = ConfigBuilder::builder()
            .set_override("server.http_port", 8080)?
            .set_override("database.url", "postgres://localhost/identity")?
            .set_override("redis.url", "redis://localhost:6379")?
            .set_override("jwt.secret", "secret")?
            .set_override("email.smtp_host", "localhost")?
            .set_override("email.from", "noreply@example.com")?;
        for (key, value) in overrides {
            builder = builder.set_override(key, value)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = load_with(vec![]).unwrap();

        assert_eq!(config.jwt.access_token_ttl_minutes, 15);
        assert_eq!(config.jwt.refresh_token_ttl().as_secs(), 7 * 24 * 3600);
        assert_eq!(config.cache.user_ttl().as_secs(), 300);
        assert_eq!(config.http_log.max_body_bytes, 1024 * 1024);
        assert_eq!(config.http_log.skip_paths, vec!["/api/v1/health"]);
        assert!(!config.report.enabled);
        assert!(!config.server.cookie_secure);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.requests_per_minute, 100);
        assert_eq!(config.rate_limit.burst_size, 20);
        assert!(!config.rate_limit.trust_forwarded_for);
    }

    #[test]
    fn test_validate_rejects_non_positive_token_lifetimes() {
        let err = load_with(vec![("jwt.refresh_token_ttl_hours", Value::from(0i64))]).unwrap_err();
        assert!(err.to_string().contains("jwt.refresh_token_ttl_hours"));

        let err =
            load_with(vec![("jwt.access_token_ttl_minutes", Value::from(-5i64))]).unwrap_err();
        assert!(err.to_string().contains("jwt.access_token_ttl_minutes"));
    }

    #[test]
    fn test_validate_rejects_oversized_values() {
        let err =
            load_with(vec![("jwt.refresh_token_ttl_hours", Value::from(i64::MAX))]).unwrap_err();
        assert!(err.to_string().contains("jwt.refresh_token_ttl_hours"));

        let err = load_with(vec![("http_log.retention_days", Value::from(i64::MAX))]).unwrap_err();
        assert!(err.to_string().contains("http_log.retention_days"));
    }

    #[test]
    fn test_validate_rejects_zero_rate_limit_only_when_enabled() {
        let err = load_with(vec![("rate_limit.burst_size", Value::from(0i64))]).unwrap_err();
        assert!(err.to_string().contains("rate_limit.burst_size"));

        let disabled = load_with(vec![
            ("rate_limit.enabled", Value::from(false)),
            ("rate_limit.burst_size", Value::from(0i64)),
        ]);
        assert!(disabled.is_ok());
    }

    #[test]
    fn test_refresh_token_ttl_covers_the_configured_hours() {
        let config = load_with(vec![("jwt.refresh_token_ttl_hours", Value::from(24i64))]).unwrap();
        assert_eq!(config.jwt.refresh_token_ttl().as_secs(), 24 * 3600);
    }
}
