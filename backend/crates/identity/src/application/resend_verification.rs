//! Resend Verification Use Case
//!
//! Answers the same way whether or not the address belongs to anyone.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::ephemeral_token::EphemeralTokenService;
use crate::application::mail;
use crate::domain::notifier::Notifier;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{email::Email, token_purpose::TokenPurpose, user_status::UserStatus};
use crate::error::IdentityResult;

pub struct ResendVerificationUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    tokens: EphemeralTokenService<R>,
    notifier: Arc<dyn Notifier>,
    config: Arc<IdentityConfig>,
}

impl<R> ResendVerificationUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, notifier: Arc<dyn Notifier>, config: Arc<IdentityConfig>) -> Self {
        Self {
            tokens: EphemeralTokenService::new(repo.clone(), config.clone()),
            repo,
            notifier,
            config,
        }
    }

    /// Issues a fresh link (revoking the previous one) only for unverified
    /// accounts. Every other case is a silent no-op.
    pub async fn execute(&self, email: String) -> IdentityResult<()> {
        let email = Email::new(email)?;

        let user = match self.repo.find_by_email(&email).await? {
            Some(user) if user.user_status == UserStatus::Unverified => user,
            _ => {
                tracing::debug!("Verification resend skipped");
                return Ok(());
            }
        };

        let issued = self
            .tokens
            .issue_for(&user.user_id, TokenPurpose::EmailVerification)
            .await?;
        self.notifier
            .send(mail::verification_email(&self.config, &user, &issued.secret));

        tracing::info!(user_id = %user.user_id, "Verification email re-sent");
        Ok(())
    }
}
