//! Ephemeral Token Entity
//!
//! A single-use secret correlating an emailed link with an account. Only the
//! SHA-256 digest of the secret is ever stored; at most one token exists per
//! user and it is never mutated, only replaced or deleted.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{token_purpose::TokenPurpose, user_id::UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralToken {
    /// Owner, unique across all live tokens
    pub user_id: UserId,
    /// Hex SHA-256 of the secret sent to the user
    pub token_hash: String,
    pub purpose: TokenPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EphemeralToken {
    /// Past its TTL the record is dead even if cleanup has not run yet.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
