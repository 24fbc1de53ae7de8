//! Signed session tokens.
//!
//! A token is a signed, time-limited credential asserting a user id,
//! carried by the client in the `token` cookie. Verification is stateless:
//! it depends only on the shared signing secret and the token's own
//! claims. Expiry is fixed at one hour from issuance and never refreshed.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradepost_core::UserId;

/// Token lifetime in seconds (1 hour, not refreshed).
const TOKEN_TTL_SECS: i64 = 3600;

/// Errors from token issuance or verification.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature invalid, malformed token, or wrong algorithm.
    #[error("invalid token")]
    Invalid,

    /// The token's expiry has passed.
    #[error("token expired")]
    Expired,

    /// Token could not be created.
    #[error("token creation failed")]
    Creation,
}

/// Claims carried by a session token. The user id is the only identity
/// information; nothing else is persisted per session.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// The authenticated user id.
    sub: i32,
    /// Issued-at (seconds since epoch).
    iat: i64,
    /// Expiry (seconds since epoch).
    exp: i64,
}

/// Issues and verifies session tokens (HS256).
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    /// Create a token service from the shared signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a token for a user, expiring one hour from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Creation` if signing fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.as_i32(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Creation)
    }

    /// Verify a token's signature and expiry, returning the asserted user id.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` if the token has expired and
    /// `TokenError::Invalid` for any other verification failure.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        Ok(UserId::new(data.claims.sub))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&SecretString::from("kJ8#mP2$vN5&xQ9!wR4@zT7*bL0^cF3%"))
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let tokens = service();
        let token = tokens.issue(UserId::new(42)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), UserId::new(42));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue(UserId::new(1)).unwrap();
        let other = TokenService::new(&SecretString::from("qW3#eR5$tY7&uI9!oP1@aS4*dF6^gH8%"));
        assert!(matches!(other.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = service();
        let mut token = tokens.issue(UserId::new(1)).unwrap();
        token.push('x');
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            service().verify("not-a-token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();

        // Hand-roll a token whose expiry is well past the default leeway
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            iat: now - 2 * TOKEN_TTL_SECS,
            exp: now - TOKEN_TTL_SECS,
        };
        let token = encode(&Header::default(), &claims, &tokens.encoding).unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }
}
