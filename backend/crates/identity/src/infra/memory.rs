//! In-Memory Identity Store
//!
//! Same contract as the PostgreSQL store, uniqueness and atomic consume
//! included. Backs the router and scenario tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::entity::{
    ephemeral_token::EphemeralToken,
    user::{ProfilePatch, User},
};
use crate::domain::repository::{EphemeralTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, token_purpose::TokenPurpose, user_id::UserId, user_password::UserPassword,
    user_status::UserStatus,
};
use crate::error::{IdentityError, IdentityResult};

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    /// At most one live token per user
    tokens: HashMap<UserId, EphemeralToken>,
}

impl MemoryState {
    /// Uniqueness check against every account except `exclude`.
    fn ensure_unique(&self, candidate: &User, exclude: Option<&UserId>) -> IdentityResult<()> {
        for other in self.users.values() {
            if Some(&other.user_id) == exclude {
                continue;
            }
            if other.email == candidate.email {
                return Err(IdentityError::DuplicateEmail);
            }
            if other.user_name == candidate.user_name {
                return Err(IdentityError::DuplicateUsername);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored ephemeral tokens, live or not
    pub async fn token_count(&self) -> usize {
        self.state.read().await.tokens.len()
    }
}

impl UserRepository for InMemoryIdentityStore {
    async fn create(&self, user: &User) -> IdentityResult<()> {
        let mut state = self.state.write().await;
        state.ensure_unique(user, None)?;
        state.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| &u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn update_status(&self, user_id: &UserId, status: UserStatus) -> IdentityResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or(IdentityError::UserNotFound)?;
        user.user_status = status;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_profile(&self, user_id: &UserId, patch: &ProfilePatch) -> IdentityResult<User> {
        let mut state = self.state.write().await;
        let mut updated = state
            .users
            .get(user_id)
            .cloned()
            .ok_or(IdentityError::UserNotFound)?;
        updated.apply_patch(patch);
        state.ensure_unique(&updated, Some(user_id))?;
        state.users.insert(*user_id, updated.clone());
        Ok(updated)
    }

    async fn set_password_hash(&self, user_id: &UserId, hash: &UserPassword) -> IdentityResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or(IdentityError::UserNotFound)?;
        user.password_hash = Some(hash.clone());
        user.updated_at = Utc::now();
        Ok(())
    }
}

impl EphemeralTokenRepository for InMemoryIdentityStore {
    async fn replace_for_user(&self, token: &EphemeralToken) -> IdentityResult<()> {
        let mut state = self.state.write().await;
        state.tokens.insert(token.user_id, token.clone());
        Ok(())
    }

    async fn consume(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> IdentityResult<Option<EphemeralToken>> {
        // Lookup and removal happen under one write lock
        let mut state = self.state.write().await;
        let owner = state
            .tokens
            .values()
            .find(|t| t.token_hash == token_hash && t.purpose == purpose && !t.is_expired(now))
            .map(|t| t.user_id);
        Ok(owner.and_then(|user_id| state.tokens.remove(&user_id)))
    }

    async fn delete_for_user(&self, user_id: &UserId) -> IdentityResult<u64> {
        let mut state = self.state.write().await;
        Ok(u64::from(state.tokens.remove(user_id).is_some()))
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> IdentityResult<u64> {
        let mut state = self.state.write().await;
        let before = state.tokens.len();
        state.tokens.retain(|_, t| !t.is_expired(now));
        Ok((before - state.tokens.len()) as u64)
    }
}
