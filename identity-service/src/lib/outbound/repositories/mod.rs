pub mod health;
pub mod httplog;
pub mod user;

pub use health::PostgresHealthIndicator;
pub use httplog::PostgresHttpLogRepository;
pub use user::PostgresUserRepository;
