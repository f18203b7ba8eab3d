use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed, expired, or badly signed token.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token is otherwise valid but was issued before the user's last
    /// password change.
    #[error("Password was changed after this token was issued")]
    StaleToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, stringified.
    pub sub: String,
    /// Issue time, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidToken)
    }
}

/// Issues and verifies the signed bearer tokens used for stateless
/// authentication. HS256 with a process-wide secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, expires_in_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(expires_in_days),
        }
    }

    pub fn issue(&self, user_id: i32) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token with an explicit issue time. Exposed so staleness and
    /// expiry behavior can be exercised without clock tricks.
    pub fn issue_at(&self, user_id: i32, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign token")
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidToken)
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reject tokens issued before the user's last password change.
    pub fn ensure_fresh(
        claims: &Claims,
        password_changed_at: Option<&str>,
    ) -> Result<(), TokenError> {
        let Some(changed_at) = password_changed_at else {
            return Ok(());
        };
        let changed = DateTime::parse_from_rfc3339(changed_at)
            .map_err(|_| TokenError::InvalidToken)?
            .timestamp();
        if claims.iat < changed {
            return Err(TokenError::StaleToken);
        }
        Ok(())
    }
}

/// Generate a password-reset token: the raw hex value goes to the user by
/// email, only the digest is stored.
#[must_use]
pub fn generate_reset_token() -> (String, String) {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    let raw = to_hex(&bytes);
    let digest = hash_reset_token(&raw);
    (raw, digest)
}

/// One-way transform applied to a reset token before storage or lookup.
#[must_use]
pub fn hash_reset_token(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    to_hex(&digest)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", 90)
    }

    #[test]
    fn verify_roundtrips_user_id_until_expiry() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
    }

    #[test]
    fn expired_token_is_invalid() {
        let tokens = service();
        let token = tokens.issue_at(42, Utc::now() - Duration::days(91)).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = service().issue(42).unwrap();
        let other = TokenService::new("different-secret", 90);
        assert_eq!(other.verify(&token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(
            service().verify("not.a.token"),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn token_issued_before_password_change_is_stale() {
        let tokens = service();
        let issued = Utc::now() - Duration::hours(2);
        let token = tokens.issue_at(7, issued).unwrap();
        let claims = tokens.verify(&token).unwrap();

        let changed = (Utc::now() - Duration::hours(1)).to_rfc3339();
        assert_eq!(
            TokenService::ensure_fresh(&claims, Some(&changed)),
            Err(TokenError::StaleToken)
        );
    }

    #[test]
    fn token_issued_after_password_change_is_fresh() {
        let tokens = service();
        let token = tokens.issue(7).unwrap();
        let claims = tokens.verify(&token).unwrap();

        let changed = (Utc::now() - Duration::hours(1)).to_rfc3339();
        assert!(TokenService::ensure_fresh(&claims, Some(&changed)).is_ok());
        assert!(TokenService::ensure_fresh(&claims, None).is_ok());
    }

    #[test]
    fn reset_token_digest_matches_rehash_of_raw_value() {
        let (raw, digest) = generate_reset_token();
        assert_eq!(raw.len(), 64);
        assert_eq!(digest.len(), 64);
        assert_ne!(raw, digest);
        assert_eq!(hash_reset_token(&raw), digest);
    }
}
