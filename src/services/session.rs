//! Session validation: JWT access tokens minted by the identity provider
//!
//! This service never issues login sessions itself; the external identity
//! provider does, signing with the shared `JWT_SECRET`. Here we only
//! validate tokens and extract the subject identity.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // opaque user identity
    pub exp: i64,    // expiry timestamp
    pub iat: i64,    // issued at
}

#[derive(Debug)]
pub enum SessionError {
    InvalidToken,
    Expired,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidToken => write!(f, "Invalid token"),
            SessionError::Expired => write!(f, "Token expired"),
        }
    }
}

/// Validate a JWT access token and return the user id it names
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<String, SessionError> {
    // Explicitly validate with HS256 only to prevent algorithm confusion attacks
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub", "iat"]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::InvalidToken,
        })?;

    Ok(token_data.claims.sub)
}

/// Mint a short-lived access token. The identity provider owns issuance in
/// production; this exists for local tooling and tests.
#[allow(dead_code)]
pub fn create_access_token(
    user_id: &str,
    secret: &[u8],
    ttl_minutes: i64,
) -> Result<String, SessionError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|_| SessionError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let secret = b"test-secret";
        let token = create_access_token("user_abc", secret, 10).unwrap();
        assert_eq!(validate_access_token(&token, secret).unwrap(), "user_abc");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token("user_abc", b"secret-a", 10).unwrap();
        assert!(validate_access_token(&token, b"secret-b").is_err());
    }
}
