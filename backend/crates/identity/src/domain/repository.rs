//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer
//! (PostgreSQL for deployments, in-memory for tests and local runs).

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    ephemeral_token::EphemeralToken,
    user::{ProfilePatch, User},
};
use crate::domain::value_object::{
    email::Email, token_purpose::TokenPurpose, user_id::UserId, user_password::UserPassword,
    user_status::UserStatus,
};
use crate::error::IdentityResult;

/// Credential store
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a new account.
    ///
    /// Fails with `DuplicateEmail` / `DuplicateUsername` when either is taken.
    async fn create(&self, user: &User) -> IdentityResult<()>;

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<User>>;

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<User>>;

    /// Pure field transition. Fails with `UserNotFound` if the row is gone.
    async fn update_status(&self, user_id: &UserId, status: UserStatus) -> IdentityResult<()>;

    /// Apply the present fields of `patch`, after checking that a new email or
    /// user name is not used by any *other* account. Returns the stored result.
    async fn update_profile(&self, user_id: &UserId, patch: &ProfilePatch) -> IdentityResult<User>;

    /// Unconditional; the caller has already authorized the change.
    async fn set_password_hash(&self, user_id: &UserId, hash: &UserPassword) -> IdentityResult<()>;
}

/// Ephemeral token store
#[trait_variant::make(EphemeralTokenRepository: Send)]
pub trait LocalEphemeralTokenRepository {
    /// Store `token`, atomically replacing whatever token its owner had.
    async fn replace_for_user(&self, token: &EphemeralToken) -> IdentityResult<()>;

    /// Atomic find-and-delete of a live token with this digest and purpose.
    ///
    /// Under concurrent calls with the same digest at most one returns `Some`.
    /// Expired tokens are never returned.
    async fn consume(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> IdentityResult<Option<EphemeralToken>>;

    async fn delete_for_user(&self, user_id: &UserId) -> IdentityResult<u64>;

    /// Drop every token past its expiry. Returns how many were removed.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> IdentityResult<u64>;
}

/// Everything the identity flows need from one backing store.
pub trait IdentityStore:
    UserRepository + EphemeralTokenRepository + Send + Sync + 'static
{
}

impl<T> IdentityStore for T where
    T: UserRepository + EphemeralTokenRepository + Send + Sync + 'static
{
}
