//! Token Issuer
//!
//! Mints and verifies the signed (HS256) access and refresh tokens. Each
//! class has its own key and lifetime: a leaked access key cannot forge
//! refresh tokens and vice versa. The payload is the account id and role,
//! plus the registered `iat` / `exp` / `jti` claims.

use std::time::Duration;

use chrono::{DateTime, Utc};
use derive_more::Display;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::IdentityConfig;
use crate::domain::value_object::{user_id::UserId, user_role::UserRole};
use crate::error::{IdentityError, IdentityResult};

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    #[display("access")]
    Access,
    #[display("refresh")]
    Refresh,
}

/// Verification failures. Both are final: there is no soft-fail path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, wrong key/class, malformed token or claims
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidSignature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, the key a revocation list would use
    pub jti: String,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidSignature)
    }
}

#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access + refresh pair returned by a successful login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: MintedToken,
    pub refresh: MintedToken,
}

#[derive(Clone)]
struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl ClassKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    access: ClassKeys,
    refresh: ClassKeys,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &IdentityConfig) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Strict expiry: a token is dead the second its exp passes
        validation.leeway = 0;

        Self {
            access: ClassKeys::new(
                config.access_token_secret.as_bytes(),
                config.access_token_ttl,
            ),
            refresh: ClassKeys::new(
                config.refresh_token_secret.as_bytes(),
                config.refresh_token_ttl,
            ),
            validation,
        }
    }

    fn keys(&self, class: TokenClass) -> &ClassKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    pub fn mint(&self, user_id: &UserId, role: UserRole, class: TokenClass) -> IdentityResult<MintedToken> {
        let keys = self.keys(class);
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(keys.ttl)
            .map_err(|e| IdentityError::Internal(format!("{class} token ttl out of range: {e}")))?;
        let expires_at = now + ttl;

        let claims = SessionClaims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &keys.encoding)
            .map_err(|e| IdentityError::Internal(format!("{class} token encoding failed: {e}")))?;

        Ok(MintedToken { token, expires_at })
    }

    pub fn mint_pair(&self, user_id: &UserId, role: UserRole) -> IdentityResult<TokenPair> {
        Ok(TokenPair {
            access: self.mint(user_id, role, TokenClass::Access)?,
            refresh: self.mint(user_id, role, TokenClass::Refresh)?,
        })
    }

    /// Pure: no I/O, no clock other than `exp`.
    pub fn verify(&self, token: &str, class: TokenClass) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.keys(class).decoding, &self.validation)?;
        Ok(data.claims)
    }
}
