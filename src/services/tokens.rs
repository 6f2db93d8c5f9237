//! Password hashing, access-token issuance and one-time token generation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

const DUMMY_PASSWORD: &str = "book-exchange-timing-equaliser";

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: i64,
    pub email: String,
    /// Session ID; the token dies with the session row.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    verification_ttl: Duration,
    reset_ttl: Duration,
    bcrypt_cost: u32,
    /// Verified against on unknown-account logins so they cost the same bcrypt work.
    dummy_hash: Arc<str>,
}

impl TokenService {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            access_ttl: Duration::minutes(cfg.access_token_ttl_minutes),
            verification_ttl: Duration::hours(cfg.verification_token_ttl_hours),
            reset_ttl: Duration::minutes(cfg.reset_token_ttl_minutes),
            bcrypt_cost: cfg.bcrypt_cost,
            dummy_hash: bcrypt::hash(DUMMY_PASSWORD, cfg.bcrypt_cost).unwrap_or_default().into(),
        }
    }

    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }

    /// Expiry (unix seconds) for a session created now.
    pub fn session_expiry(&self) -> i64 {
        (Utc::now() + self.access_ttl).timestamp()
    }

    pub fn verification_expiry(&self) -> i64 {
        (Utc::now() + self.verification_ttl).timestamp()
    }

    pub fn reset_expiry(&self) -> i64 {
        (Utc::now() + self.reset_ttl).timestamp()
    }

    /// Signs an access token bound to `session_id`, expiring with the session.
    pub fn issue_access_token(
        &self,
        user_id: i64,
        email: &str,
        session_id: &str,
        expires_at: i64,
    ) -> AppResult<IssuedToken> {
        let now = Utc::now().timestamp();
        let claims = Claims { sub: user_id, email: email.to_string(), sid: session_id.to_string(), iat: now, exp: expires_at };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))?;
        Ok(IssuedToken { token, expires_at, expires_in: (expires_at - now).max(0) })
    }

    /// Checks signature and expiry. Session liveness is checked by the caller.
    pub fn decode_access_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(bcrypt::hash(password, self.bcrypt_cost)?)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

/// Opaque single-use token for verification and reset links.
pub fn generate_one_time_token() -> String {
    Uuid::new_v4().simple().to_string()
}
