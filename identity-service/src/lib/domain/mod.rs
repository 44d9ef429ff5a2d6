pub mod auth;
pub mod cache;
pub mod health;
pub mod httplog;
pub mod report;
pub mod user;
