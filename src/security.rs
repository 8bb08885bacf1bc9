use std::sync::LazyLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

// =============================================================================
// Password Hashing
// =============================================================================

/// Hash of a throwaway password, verified against when the username is unknown
static DUMMY_PASSWORD_HASH: LazyLock<String> = LazyLock::new(|| {
    hash_password("dummy-password-for-unknown-users").unwrap_or_else(|e| {
        tracing::error!("Could not prepare dummy password hash: {}", e);
        String::new()
    })
});

/// Hash a plaintext password with Argon2id and a fresh random salt
///
/// # Arguments
/// * `password` - The plaintext password, taken verbatim
///
/// # Returns
/// * The PHC string (`$argon2id$v=19$...`). It embeds the salt and the
///   parameters, so [`verify_password`] needs nothing else.
///
/// # Errors
/// * `AppError::PasswordHash` if Argon2 rejects the input
///
/// # Security
/// - Only the PHC string is ever stored
/// - CPU and memory heavy; call it from `spawn_blocking`
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

/// Verify a plaintext password against a stored PHC hash
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Burn one Argon2 verification for a login whose username does not exist
///
/// Always returns `false`.
///
/// # Security
/// Unknown usernames and wrong passwords then cost the same hashing work, so
/// response timing does not reveal which of the two failed.
pub fn verify_password_unknown_user(password: &str) -> bool {
    let _ = verify_password(password, &DUMMY_PASSWORD_HASH);
    false
}

// =============================================================================
// Bearer Tokens
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims carried by both token types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id, the key of the revocation list
    pub jti: String,
}

impl TokenClaims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Invalid)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Could not validate credentials")]
    Invalid,

    #[error("Invalid token type")]
    WrongType,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Could not create token: {0}")]
    Encoding(String),
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and validates access/refresh tokens (HS256)
///
/// Access and refresh tokens use separate keys, so one can never be replayed
/// as the other even before the `type` claim is checked.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret_key,
            &config.jwt_refresh_secret_key,
            Duration::minutes(config.access_token_expire_minutes),
            Duration::days(config.refresh_token_expire_days),
        )
    }

    /// Issue a token with the configured lifetime for its type
    pub fn issue(&self, user_id: i64, token_type: TokenType) -> Result<IssuedToken, TokenError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(user_id, token_type, ttl)
    }

    /// Issue a token with an explicit lifetime (negative yields an expired token)
    pub fn issue_with_ttl(
        &self,
        user_id: i64,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = TokenClaims {
            sub: user_id.to_string(),
            token_type,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let key = match token_type {
            TokenType::Access => &self.access_encoding,
            TokenType::Refresh => &self.refresh_encoding,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, key).map_err(|e| {
            tracing::error!("Token encoding failed: {}", e);
            TokenError::Encoding(e.to_string())
        })?;

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Check signature, expiry and type of `token`
    ///
    /// # Arguments
    /// * `token` - The encoded JWT as sent by the client
    /// * `expected` - Which key to verify with and which `type` claim to demand
    ///
    /// # Returns
    /// * The decoded claims if the token is well formed, signed with the key
    ///   of `expected`, unexpired and of the expected type
    ///
    /// # Errors
    /// * `TokenError::Expired` once `exp` has passed (no leeway)
    /// * `TokenError::WrongType` for a valid token of the other type
    /// * `TokenError::Invalid` for anything else
    ///
    /// Revocation is not checked here; it needs the database.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<TokenClaims, TokenError> {
        let key = match expected {
            TokenType::Access => &self.access_decoding,
            TokenType::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<TokenClaims>(token, key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?
            .claims;

        if claims.token_type != expected {
            tracing::warn!("Token type mismatch: expected {:?}", expected);
            return Err(TokenError::WrongType);
        }

        Ok(claims)
    }
}
