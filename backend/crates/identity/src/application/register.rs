//! Register Use Case
//!
//! Creates an unverified student account and mails a verification link.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::ephemeral_token::EphemeralTokenService;
use crate::application::mail;
use crate::domain::entity::user::User;
use crate::domain::notifier::Notifier;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{
    email::Email,
    token_purpose::TokenPurpose,
    user_id::UserId,
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{IdentityError, IdentityResult};

/// Attempts at a generated user name before giving up
const USER_NAME_ATTEMPTS: usize = 3;

/// Register input
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Generated from the email local part when absent
    pub user_name: Option<String>,
}

/// Register output
#[derive(Debug)]
pub struct RegisterOutput {
    pub user_id: UserId,
    pub email: Email,
}

/// Register use case
pub struct RegisterUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    tokens: EphemeralTokenService<R>,
    notifier: Arc<dyn Notifier>,
    config: Arc<IdentityConfig>,
}

impl<R> RegisterUseCase<R>
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

    pub async fn execute(&self, input: RegisterInput) -> IdentityResult<RegisterOutput> {
        let first_name = required(input.first_name, "First name")?;
        let last_name = required(input.last_name, "Last name")?;
        let email = Email::new(input.email)?;
        let raw_password = RawPassword::new(input.password)?;
        let chosen_name = input
            .user_name
            .filter(|name| !name.trim().is_empty())
            .map(UserName::new)
            .transpose()?;

        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;

        let user = match chosen_name {
            Some(user_name) => {
                let user = User::register(first_name, last_name, user_name, email, password_hash);
                self.repo.create(&user).await?;
                user
            }
            None => {
                self.create_with_generated_name(first_name, last_name, email, password_hash)
                    .await?
            }
        };

        let issued = self
            .tokens
            .issue_for(&user.user_id, TokenPurpose::EmailVerification)
            .await?;
        self.notifier
            .send(mail::verification_email(&self.config, &user, &issued.secret));

        tracing::info!(
            user_id = %user.user_id,
            user_name = %user.user_name,
            "User registered"
        );

        Ok(RegisterOutput {
            user_id: user.user_id,
            email: user.email,
        })
    }

    /// A generated name colliding is not the caller's fault; roll a new suffix.
    async fn create_with_generated_name(
        &self,
        first_name: String,
        last_name: String,
        email: Email,
        password_hash: UserPassword,
    ) -> IdentityResult<User> {
        for _ in 0..USER_NAME_ATTEMPTS {
            let user_name = UserName::generate_from_local_part(email.local_part())?;
            let user = User::register(
                first_name.clone(),
                last_name.clone(),
                user_name,
                email.clone(),
                password_hash.clone(),
            );
            match self.repo.create(&user).await {
                Ok(()) => return Ok(user),
                Err(IdentityError::DuplicateUsername) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(IdentityError::Internal(
            "could not generate a unique user name".into(),
        ))
    }
}

/// Trimmed, non-empty free-text field
pub(crate) fn required(value: String, field: &str) -> IdentityResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}
