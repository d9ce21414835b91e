//! Password Reset Use Cases
//!
//! `forgot` mails a single-use reset link; `reset` redeems it. The request
//! step answers identically for known and unknown addresses.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::ephemeral_token::EphemeralTokenService;
use crate::application::mail;
use crate::domain::notifier::Notifier;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{
    email::Email,
    token_purpose::TokenPurpose,
    user_password::{RawPassword, UserPassword},
    user_status::UserStatus,
};
use crate::error::{IdentityError, IdentityResult};

/// Forgot password use case
pub struct ForgotPasswordUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    tokens: EphemeralTokenService<R>,
    notifier: Arc<dyn Notifier>,
    config: Arc<IdentityConfig>,
}

impl<R> ForgotPasswordUseCase<R>
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

    pub async fn execute(&self, email: String) -> IdentityResult<()> {
        let email = Email::new(email)?;

        let user = match self.repo.find_by_email(&email).await? {
            Some(user) if user.user_status != UserStatus::Banned => user,
            _ => {
                tracing::debug!("Password reset request skipped");
                return Ok(());
            }
        };

        let issued = self
            .tokens
            .issue_for(&user.user_id, TokenPurpose::PasswordReset)
            .await?;
        self.notifier
            .send(mail::password_reset_email(&self.config, &user, &issued.secret));

        tracing::info!(user_id = %user.user_id, "Password reset requested");
        Ok(())
    }
}

/// Reset password input
pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
}

/// Reset password use case
pub struct ResetPasswordUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    tokens: EphemeralTokenService<R>,
    config: Arc<IdentityConfig>,
}

impl<R> ResetPasswordUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self {
            tokens: EphemeralTokenService::new(repo.clone(), config.clone()),
            repo,
            config,
        }
    }

    /// The new password is validated and hashed before the token is
    /// consumed, so a rejected password leaves the link usable.
    pub async fn execute(&self, input: ResetPasswordInput) -> IdentityResult<()> {
        let raw_password = RawPassword::new(input.new_password)?;
        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;

        let token = self
            .tokens
            .consume(&input.token, TokenPurpose::PasswordReset)
            .await?;

        self.repo
            .set_password_hash(&token.user_id, &password_hash)
            .await
            .map_err(|e| match e {
                IdentityError::UserNotFound => IdentityError::TokenInvalidOrExpired,
                e => e,
            })?;

        tracing::info!(user_id = %token.user_id, "Password reset");
        Ok(())
    }
}
