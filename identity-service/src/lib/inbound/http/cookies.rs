use axum::http::header::COOKIE;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::http::HeaderValue;

use super::handlers::ApiError;
use crate::domain::auth::models::TokenPair;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const ACCESS_TOKEN_PATH: &str = "/";
/// The refresh token is only ever sent to the endpoint that consumes it.
const REFRESH_TOKEN_PATH: &str = "/api/v1/auth/refresh";

fn cookie(
    name: &str,
    value: &str,
    path: &str,
    max_age: i64,
    secure: bool,
) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{name}={value}; Path={path}; HttpOnly; SameSite=Strict; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalServerError(format!("Invalid cookie header: {}", e)))
}

/// Append `Set-Cookie` headers for both session tokens.
pub fn set_session_cookies(
    headers: &mut HeaderMap,
    tokens: &TokenPair,
    secure: bool,
) -> Result<(), ApiError> {
    headers.append(
        SET_COOKIE,
        cookie(
            ACCESS_TOKEN_COOKIE,
            &tokens.access_token,
            ACCESS_TOKEN_PATH,
            tokens.access_expires_in,
            secure,
        )?,
    );
    headers.append(
        SET_COOKIE,
        cookie(
            REFRESH_TOKEN_COOKIE,
            &tokens.refresh_token,
            REFRESH_TOKEN_PATH,
            tokens.refresh_expires_in,
            secure,
        )?,
    );
    Ok(())
}

/// Append `Set-Cookie` headers that expire both session cookies.
pub fn clear_session_cookies(headers: &mut HeaderMap, secure: bool) -> Result<(), ApiError> {
    headers.append(
        SET_COOKIE,
        cookie(ACCESS_TOKEN_COOKIE, "", ACCESS_TOKEN_PATH, 0, secure)?,
    );
    headers.append(
        SET_COOKIE,
        cookie(REFRESH_TOKEN_COOKIE, "", REFRESH_TOKEN_PATH, 0, secure)?,
    );
    Ok(())
}

/// Value of cookie `name` from the request `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name && !value.trim().is_empty()).then(|| value.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TokenPair {
        TokenPair {
            access_token: "header.payload.signature".to_string(),
            refresh_token: "b3BhcXVlLXJlZnJlc2gtdG9rZW4tMzItYnl0ZXMhISE=".to_string(),
            access_expires_in: 900,
            refresh_expires_in: 604800,
        }
    }

    #[test]
    fn test_set_session_cookies() {
        let mut headers = HeaderMap::new();
        set_session_cookies(&mut headers, &tokens(), true).unwrap();

        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();

        assert_eq!(
            cookies,
            vec![
                "access_token=header.payload.signature; Path=/; HttpOnly; SameSite=Strict; Max-Age=900; Secure",
                "refresh_token=b3BhcXVlLXJlZnJlc2gtdG9rZW4tMzItYnl0ZXMhISE=; Path=/api/v1/auth/refresh; HttpOnly; SameSite=Strict; Max-Age=604800; Secure",
            ]
        );
    }

    #[test]
    fn test_clear_session_cookies() {
        let mut headers = HeaderMap::new();
        clear_session_cookies(&mut headers, false).unwrap();

        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();

        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        assert!(cookies.iter().all(|c| !c.contains("Secure")));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=abc=; access_token=xyz"),
        );

        assert_eq!(read_cookie(&headers, "access_token").as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "refresh_token").as_deref(), Some("abc="));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_cookie_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("access_token="));

        assert_eq!(read_cookie(&headers, "access_token"), None);
    }
}
