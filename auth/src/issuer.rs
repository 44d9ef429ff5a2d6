use chrono::Duration;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::refresh::generate_refresh_token;
use crate::refresh::EntropyError;

/// Mints and verifies the credentials handed to clients.
///
/// Access tokens are signed, short-lived and stateless. Refresh tokens are
/// opaque random strings whose lifetime is owned by whoever stores them.
pub struct TokenIssuer {
    jwt_handler: JwtHandler,
    issuer: String,
    access_ttl: Duration,
}

/// Signed access token plus its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: i64,
}

/// Token issuing and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Failed to generate random token: {0}")]
    Entropy(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(msg) => TokenError::Signing(msg),
            JwtError::TokenExpired => TokenError::Expired,
            JwtError::InvalidToken(msg) => TokenError::Invalid(msg),
        }
    }
}

impl From<EntropyError> for TokenError {
    fn from(err: EntropyError) -> Self {
        TokenError::Entropy(err.0)
    }
}

impl TokenIssuer {
    /// Create a new token issuer.
    ///
    /// # Arguments
    /// * `secret` - HMAC secret for access tokens
    /// * `issuer` - Value of the `iss` claim, also required on validation
    /// * `access_ttl` - Access token lifetime
    pub fn new(secret: &[u8], issuer: impl Into<String>, access_ttl: Duration) -> Self {
        let issuer = issuer.into();

        Self {
            jwt_handler: JwtHandler::new(secret).with_issuer(&issuer),
            issuer,
            access_ttl,
        }
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Build a signed access token for `user_id`.
    ///
    /// # Errors
    /// * `Signing` - The signer failed
    pub fn issue_access_token(&self, user_id: &str) -> Result<IssuedAccessToken, TokenError> {
        let claims = Claims::for_subject(user_id, self.access_ttl).with_issuer(&self.issuer);
        let token = self.jwt_handler.encode(&claims)?;

        Ok(IssuedAccessToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Generate an opaque refresh token.
    ///
    /// # Errors
    /// * `Entropy` - The random source failed
    pub fn issue_refresh_token(&self) -> Result<String, TokenError> {
        Ok(generate_refresh_token()?)
    }

    /// Verify an access token and return the user id it was issued to.
    ///
    /// # Errors
    /// * `Expired` - Past `exp`
    /// * `Invalid` - Any other verification failure
    pub fn validate_access_token(&self, token: &str) -> Result<String, TokenError> {
        let claims: Claims = self.jwt_handler.decode(token)?;

        if claims.sub.is_empty() {
            return Err(TokenError::Invalid("empty subject".to_string()));
        }

        Ok(claims.sub)
    }

    /// Seconds until an access token issued now expires.
    pub fn access_expires_in(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, "identity-service", Duration::minutes(15))
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let issuer = issuer();
        let user_id = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";

        let issued = issuer
            .issue_access_token(user_id)
            .expect("Failed to issue token");
        assert!(!issued.token.is_empty());
        assert!(issued.expires_at > Utc::now().timestamp());

        let subject = issuer
            .validate_access_token(&issued.token)
            .expect("Token validation failed");
        assert_eq!(subject, user_id);
    }

    #[test]
    fn test_expired_token_is_distinguishable() {
        let expired_issuer = TokenIssuer::new(SECRET, "identity-service", Duration::minutes(-5));
        let issued = expired_issuer
            .issue_access_token("user123")
            .expect("Failed to issue token");

        assert_eq!(
            issuer().validate_access_token(&issued.token),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_bad_signature_is_invalid() {
        let other = TokenIssuer::new(
            b"another_secret_key_at_least_32_bytes",
            "identity-service",
            Duration::minutes(15),
        );
        let issued = other.issue_access_token("user123").expect("issue");

        let result = issuer().validate_access_token(&issued.token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let result = issuer().validate_access_token("invalid.token.here");
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_foreign_issuer_is_invalid() {
        let foreign = TokenIssuer::new(SECRET, "someone-else", Duration::minutes(15));
        let issued = foreign.issue_access_token("user123").expect("issue");

        let result = issuer().validate_access_token(&issued.token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_issue_refresh_token() {
        let issuer = issuer();

        let first = issuer.issue_refresh_token().expect("entropy");
        let second = issuer.issue_refresh_token().expect("entropy");
        assert!(!first.is_empty());
        assert_ne!(first, second);
    }

    #[test]
    fn test_access_expires_in() {
        assert_eq!(issuer().access_expires_in(), 900);
    }
}
