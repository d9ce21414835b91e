//! Ephemeral Token Lifecycle
//!
//! Generates, issues and redeems the single-use secrets behind verification
//! and password-reset links. The plaintext secret only ever leaves through
//! the outgoing email; the store sees its SHA-256 digest.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::config::IdentityConfig;
use crate::domain::entity::ephemeral_token::EphemeralToken;
use crate::domain::repository::EphemeralTokenRepository;
use crate::domain::value_object::{token_purpose::TokenPurpose, user_id::UserId};
use crate::error::{IdentityError, IdentityResult};

/// 32 bytes = 256 bits of entropy, 64 hex chars on the wire
const TOKEN_BYTES: usize = 32;

/// Secret handed to the caller exactly once, for embedding in a link.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

pub struct EphemeralTokenService<R>
where
    R: EphemeralTokenRepository,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> EphemeralTokenService<R>
where
    R: EphemeralTokenRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    /// Fresh random secret from the OS CSPRNG, hex encoded.
    pub fn generate() -> String {
        platform::crypto::random_hex(TOKEN_BYTES)
    }

    fn digest(secret: &str) -> String {
        platform::crypto::sha256_hex(secret.as_bytes())
    }

    /// Issue a token for `user_id`, invalidating any token the user still had.
    /// The TTL clock starts now.
    pub async fn issue_for(&self, user_id: &UserId, purpose: TokenPurpose) -> IdentityResult<IssuedToken> {
        let secret = Self::generate();
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.config.ephemeral_token_ttl)
            .map_err(|e| IdentityError::Internal(format!("ephemeral token ttl out of range: {e}")))?;

        let token = EphemeralToken {
            user_id: *user_id,
            token_hash: Self::digest(&secret),
            purpose,
            created_at: now,
            expires_at: now + ttl,
        };
        self.repo.replace_for_user(&token).await?;

        tracing::debug!(user_id = %user_id, purpose = %purpose, "Ephemeral token issued");

        Ok(IssuedToken {
            secret,
            expires_at: token.expires_at,
        })
    }

    /// Redeem a secret. Exactly one concurrent caller can win; everyone else
    /// (and every later caller) gets `TokenInvalidOrExpired`.
    pub async fn consume(&self, secret: &str, purpose: TokenPurpose) -> IdentityResult<EphemeralToken> {
        // Anything that cannot be one of ours is rejected without a lookup
        if secret.len() != TOKEN_BYTES * 2 || !secret.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdentityError::TokenInvalidOrExpired);
        }

        let now = Utc::now();
        let token = self
            .repo
            .consume(&Self::digest(&secret.to_ascii_lowercase()), purpose, now)
            .await?
            .ok_or(IdentityError::TokenInvalidOrExpired)?;

        // The store filters on expiry too; this guards against a lagging clock there
        if token.is_expired(now) {
            return Err(IdentityError::TokenInvalidOrExpired);
        }

        tracing::debug!(user_id = %token.user_id, purpose = %purpose, "Ephemeral token consumed");
        Ok(token)
    }

    pub async fn revoke_for(&self, user_id: &UserId) -> IdentityResult<()> {
        self.repo.delete_for_user(user_id).await?;
        Ok(())
    }
}
