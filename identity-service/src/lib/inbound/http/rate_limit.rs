use std::net::IpAddr;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header::RETRY_AFTER;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use governor::DefaultKeyedRateLimiter;
use governor::Quota;
use governor::RateLimiter;
use thiserror::Error;

use super::handlers::ApiError;
use super::request_log::forwarded_for;
use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Rate limit {0} must be greater than 0")]
    ZeroQuota(&'static str),
}

/// Token bucket per client address.
///
/// A client may send `burst_size` requests at once, after which its bucket
/// refills at `requests_per_minute`.
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    retry_after: Duration,
    trust_forwarded_for: bool,
}

impl ClientRateLimiter {
    /// # Errors
    /// * `ZeroQuota` - `requests_per_minute` or `burst_size` is 0
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or(RateLimitError::ZeroQuota("requests_per_minute"))?;
        let burst =
            NonZeroU32::new(config.burst_size).ok_or(RateLimitError::ZeroQuota("burst_size"))?;
        let quota = Quota::per_minute(per_minute).allow_burst(burst);
        let retry_after = quota.replenish_interval();

        Ok(Self {
            limiter: RateLimiter::keyed(quota),
            retry_after,
            trust_forwarded_for: config.trust_forwarded_for,
        })
    }

    /// Take one request from `client`'s bucket, or return how long until the
    /// next one is available.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&client)
            .map_err(|_| self.retry_after)
    }

    /// Forget clients whose buckets have refilled. Returns how many remain.
    pub fn retain_recent(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    fn client_key(
        &self,
        headers: &HeaderMap,
        peer: Option<&ConnectInfo<SocketAddr>>,
    ) -> Option<IpAddr> {
        let forwarded = if self.trust_forwarded_for {
            forwarded_for(headers).and_then(|hop| hop.parse::<IpAddr>().ok())
        } else {
            None
        };

        forwarded.or_else(|| peer.map(|ConnectInfo(addr)| addr.ip()))
    }
}

/// Middleware rejecting clients that exhausted their bucket with 429.
///
/// Requests whose client address cannot be determined are let through.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<ClientRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(client) = limiter.client_key(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
    ) else {
        return next.run(req).await;
    };

    match limiter.check(client) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            tracing::warn!(client = %client, path = %req.uri().path(), "Rate limit exceeded");

            let mut response =
                ApiError::TooManyRequests("Too many requests, try again later".to_string())
                    .into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(wait)));
            response
        }
    }
}

/// Whole seconds, rounded up, never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}
