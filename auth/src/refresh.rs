use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Bytes of entropy in an opaque refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Random source failure while minting a refresh token.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Random source unavailable: {0}")]
pub struct EntropyError(pub String);

/// Generate an opaque refresh token.
///
/// 256 bits from the operating system RNG, URL-safe base64 encoded
/// (44 characters including padding).
///
/// # Errors
/// * `EntropyError` - The OS random source failed
pub fn generate_refresh_token() -> Result<String, EntropyError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EntropyError(e.to_string()))?;

    Ok(URL_SAFE.encode(bytes))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_refresh_token_shape() {
        let token = generate_refresh_token().expect("entropy");

        assert_eq!(token.len(), 44);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));

        let decoded = URL_SAFE.decode(&token).expect("valid base64");
        assert_eq!(decoded.len(), REFRESH_TOKEN_BYTES);
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let tokens: HashSet<String> = (0..64)
            .map(|_| generate_refresh_token().expect("entropy"))
            .collect();

        assert_eq!(tokens.len(), 64);
    }
}
