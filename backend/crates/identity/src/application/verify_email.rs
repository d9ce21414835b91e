//! Verify Email Use Case
//!
//! Redeems a verification link and flips the account to `verified`.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::ephemeral_token::EphemeralTokenService;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{token_purpose::TokenPurpose, user_status::UserStatus};
use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// Idempotent success; leftover tokens are cleared
    AlreadyVerified,
}

pub struct VerifyEmailUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    tokens: EphemeralTokenService<R>,
}

impl<R> VerifyEmailUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self {
            tokens: EphemeralTokenService::new(repo.clone(), config),
            repo,
        }
    }

    pub async fn execute(&self, secret: &str) -> IdentityResult<VerificationOutcome> {
        let token = self
            .tokens
            .consume(secret, TokenPurpose::EmailVerification)
            .await?;

        // Owner deleted between issue and redeem
        let user = self
            .repo
            .find_by_id(&token.user_id)
            .await?
            .ok_or(IdentityError::TokenInvalidOrExpired)?;

        match user.user_status {
            UserStatus::Unverified => {
                self.repo
                    .update_status(&user.user_id, UserStatus::Verified)
                    .await?;
                tracing::info!(user_id = %user.user_id, "Email verified");
                Ok(VerificationOutcome::Verified)
            }
            UserStatus::Verified => {
                self.tokens.revoke_for(&user.user_id).await?;
                Ok(VerificationOutcome::AlreadyVerified)
            }
            UserStatus::Banned => Err(IdentityError::AccountBanned),
        }
    }
}
