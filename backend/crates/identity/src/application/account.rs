//! Account Maintenance Use Cases
//!
//! Operations on an already authenticated account: profile edits, adding a
//! password to a federation-only account, changing it, and the
//! administrative status switch.

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::ephemeral_token::EphemeralTokenService;
use crate::application::mail;
use crate::application::register::required;
use crate::domain::entity::{principal::Principal, user::ProfilePatch};
use crate::domain::notifier::Notifier;
use crate::domain::repository::{IdentityStore, UserRepository};
use crate::domain::value_object::{
    email::Email,
    token_purpose::TokenPurpose,
    user_id::UserId,
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
    user_status::UserStatus,
};
use crate::error::{IdentityError, IdentityResult};

pub const NAME_MAX_LENGTH: usize = 50;
pub const BIOGRAPHY_MAX_LENGTH: usize = 500;
pub const IMAGE_URL_MAX_LENGTH: usize = 2048;

// ============================================================================
// Profile
// ============================================================================

/// Raw profile update; `None` leaves the field untouched.
#[derive(Debug, Default)]
pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub biography: Option<String>,
    pub user_image: Option<String>,
}

impl UpdateProfileInput {
    fn into_patch(self) -> IdentityResult<ProfilePatch> {
        let patch = ProfilePatch {
            first_name: self
                .first_name
                .map(|v| bounded_name(v, "First name"))
                .transpose()?,
            last_name: self
                .last_name
                .map(|v| bounded_name(v, "Last name"))
                .transpose()?,
            user_name: self.user_name.map(UserName::new).transpose()?,
            email: self.email.map(Email::new).transpose()?,
            biography: self.biography.map(biography).transpose()?,
            user_image: self.user_image.map(image_url).transpose()?,
        };
        if patch.is_empty() {
            return Err(IdentityError::Validation("No profile fields to update".into()));
        }
        Ok(patch)
    }
}

fn bounded_name(value: String, field: &str) -> IdentityResult<String> {
    let value = required(value, field)?;
    if value.chars().count() > NAME_MAX_LENGTH {
        return Err(IdentityError::Validation(format!(
            "{field} must be at most {NAME_MAX_LENGTH} characters"
        )));
    }
    Ok(value)
}

fn biography(value: String) -> IdentityResult<String> {
    let value = value.trim().to_owned();
    if value.chars().count() > BIOGRAPHY_MAX_LENGTH {
        return Err(IdentityError::Validation(format!(
            "Biography must be at most {BIOGRAPHY_MAX_LENGTH} characters"
        )));
    }
    Ok(value)
}

fn image_url(value: String) -> IdentityResult<String> {
    let value = value.trim().to_owned();
    if value.len() > IMAGE_URL_MAX_LENGTH
        || !(value.starts_with("https://") || value.starts_with("http://"))
    {
        return Err(IdentityError::Validation(
            "Profile image must be an http(s) URL".into(),
        ));
    }
    Ok(value)
}

pub struct UpdateProfileUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    tokens: EphemeralTokenService<R>,
    notifier: Arc<dyn Notifier>,
    config: Arc<IdentityConfig>,
}

impl<R> UpdateProfileUseCase<R>
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

    /// A new email address has to be proven again: a verified account drops
    /// back to `unverified` and a fresh verification link goes to the new
    /// address. Uniqueness conflicts surface as `DuplicateEmail` /
    /// `DuplicateUsername`.
    pub async fn execute(&self, user_id: &UserId, input: UpdateProfileInput) -> IdentityResult<Principal> {
        let patch = input.into_patch()?;
        let current = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        let email_changed = patch
            .email
            .as_ref()
            .is_some_and(|email| *email != current.email);

        let mut user = self.repo.update_profile(user_id, &patch).await?;

        if email_changed && user.user_status != UserStatus::Banned {
            if user.user_status == UserStatus::Verified {
                self.repo
                    .update_status(user_id, UserStatus::Unverified)
                    .await?;
                user.user_status = UserStatus::Unverified;
            }
            let issued = self
                .tokens
                .issue_for(user_id, TokenPurpose::EmailVerification)
                .await?;
            self.notifier
                .send(mail::verification_email(&self.config, &user, &issued.secret));
            tracing::info!(user_id = %user_id, "Email changed; re-verification required");
        }

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(Principal::from(user))
    }
}

// ============================================================================
// Passwords
// ============================================================================

/// Adds a password to an account that has none (federated sign-ups).
pub struct SetPasswordUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<IdentityConfig>,
}

impl<U> SetPasswordUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<IdentityConfig>) -> Self {
        Self { user_repo, config }
    }

    pub async fn execute(&self, user_id: &UserId, new_password: String) -> IdentityResult<()> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;
        if user.has_password() {
            return Err(IdentityError::Validation(
                "Password already set; use change password instead".into(),
            ));
        }

        let raw_password = RawPassword::new(new_password)?;
        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;
        self.user_repo
            .set_password_hash(user_id, &password_hash)
            .await?;

        tracing::info!(user_id = %user_id, "Password set");
        Ok(())
    }
}

pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

pub struct ChangePasswordUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<IdentityConfig>,
}

impl<U> ChangePasswordUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<IdentityConfig>) -> Self {
        Self { user_repo, config }
    }

    pub async fn execute(&self, user_id: &UserId, input: ChangePasswordInput) -> IdentityResult<()> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;
        let Some(current_hash) = &user.password_hash else {
            return Err(IdentityError::FederatedAccount);
        };

        let pepper = self.config.pepper();
        let current = RawPassword::for_verification(input.current_password);
        if !current_hash.verify(&current, pepper) {
            return Err(IdentityError::InvalidCredential);
        }

        let raw_password = RawPassword::new(input.new_password)?;
        if current_hash.verify(&raw_password, pepper) {
            return Err(IdentityError::Validation(
                "New password must differ from the current one".into(),
            ));
        }
        let password_hash = UserPassword::from_raw(&raw_password, pepper)?;
        self.user_repo
            .set_password_hash(user_id, &password_hash)
            .await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

// ============================================================================
// Administration
// ============================================================================

pub struct UpdateUserStatusUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
}

impl<R> UpdateUserStatusUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Banning also drops any pending verification or reset link. Only
    /// verify-email can leave `unverified`, and nothing leads back to it.
    pub async fn execute(
        &self,
        actor: &UserId,
        target: &UserId,
        status: UserStatus,
    ) -> IdentityResult<Principal> {
        if actor == target {
            return Err(IdentityError::Validation(
                "Administrators cannot change their own status".into(),
            ));
        }

        let current = self
            .repo
            .find_by_id(target)
            .await?
            .ok_or(IdentityError::UserNotFound)?;
        if status == UserStatus::Unverified && current.user_status != UserStatus::Unverified {
            return Err(IdentityError::Validation(
                "Accounts cannot be returned to unverified".into(),
            ));
        }

        self.repo.update_status(target, status).await?;
        if status == UserStatus::Banned {
            self.repo.delete_for_user(target).await?;
        }

        let user = self
            .repo
            .find_by_id(target)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        tracing::info!(actor = %actor, user_id = %target, status = %status, "User status changed");
        Ok(Principal::from(user))
    }
}
