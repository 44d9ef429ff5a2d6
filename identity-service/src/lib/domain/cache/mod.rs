pub mod errors;
pub mod ports;

/// Cache key for the public projection of a user.
pub fn user_cache_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Session slot holding the current refresh token of a user.
pub fn refresh_token_key(user_id: &str) -> String {
    format!("refresh_token:{}", user_id)
}

/// Bearer index resolving a refresh token to its owner.
pub fn refresh_session_key(token: &str) -> String {
    format!("refresh_session:{}", token)
}
