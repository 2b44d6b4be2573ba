use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{Role, User};

/// Development fallback used when `JWT_SECRET` is not set.
pub const DEFAULT_SECRET: &str = "your_jwt_secret_key-please-change";

/// Every token expires one day after it is issued.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const MIN_SECRET_LEN: usize = 32;

/// Opaque claim set carried by a token.
pub type Claims = Map<String, Value>;

/// Token failures are deliberately opaque; the underlying cause is logged
/// where it happens and then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Error signing JWT token")]
    Signing,

    #[error("Error verifying JWT token")]
    Verification,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
}

impl JwtConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = match lookup("JWT_SECRET").filter(|secret| !secret.is_empty()) {
            Some(secret) => secret,
            None => {
                log::warn!("JWT_SECRET is not set, falling back to the development secret");
                DEFAULT_SECRET.to_string()
            }
        };

        if secret.len() < MIN_SECRET_LEN {
            log::warn!(
                "JWT_SECRET is shorter than {} bytes; use a longer secret in production",
                MIN_SECRET_LEN
            );
        }

        Self {
            secret,
            ttl: TOKEN_TTL,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Claims the HTTP layer stores in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl From<&User> for SessionClaims {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// HS256 signer/verifier over a shared secret.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Audience is only checked when one is expected
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs `payload` with `iat` set to now and `exp` one TTL later.
    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, TokenError> {
        self.sign_at(payload, Utc::now().timestamp())
    }

    /// Same as [`sign`](Self::sign) with an explicit issue time in unix seconds.
    /// A payload that already carries `iat` keeps it.
    pub fn sign_at<T: Serialize>(&self, payload: &T, issued_at: i64) -> Result<String, TokenError> {
        let claims = self.stamp(payload, issued_at).map_err(|reason| {
            log::error!("Error signing JWT token: {}", reason);
            TokenError::Signing
        })?;

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |err| {
                log::error!("Error signing JWT token: {}", err);
                TokenError::Signing
            },
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_as(token)
    }

    pub fn verify_as<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        jsonwebtoken::decode::<T>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                log::error!("Error verifying JWT token: {}", err);
                TokenError::Verification
            })
    }

    fn stamp<T: Serialize>(&self, payload: &T, issued_at: i64) -> Result<Claims, String> {
        let mut claims = match serde_json::to_value(payload) {
            Ok(Value::Object(claims)) => claims,
            Ok(other) => {
                return Err(format!(
                    "payload must be a plain object, got {}",
                    crate::validation::type_name(&other)
                ))
            }
            Err(err) => return Err(err.to_string()),
        };

        if claims.contains_key("exp") {
            return Err("payload already has an \"exp\" property".to_string());
        }

        let issued_at = claims
            .get("iat")
            .and_then(Value::as_i64)
            .unwrap_or(issued_at);
        let expires_at = issued_at.saturating_add(self.ttl.as_secs() as i64);

        claims.insert("iat".to_string(), Value::from(issued_at));
        claims.insert("exp".to_string(), Value::from(expires_at));
        Ok(claims)
    }
}
