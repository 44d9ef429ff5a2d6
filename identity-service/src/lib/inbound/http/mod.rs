pub mod cookies;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod request_log;
pub mod router;
