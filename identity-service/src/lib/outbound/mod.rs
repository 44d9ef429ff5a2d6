pub mod cache;
pub mod mail;
pub mod repositories;
