//! User Status Value Object
//!
//! ```text
//! unverified ──verify-email──▶ verified
//!      │                          │
//!      └───────── admin ──────────┴──▶ banned
//! ```
//!
//! Verification is one-way. Banning (and lifting a ban) is an administrative
//! action; a lifted ban returns the account to `verified`. Changing the email
//! address is the only road back to `unverified`: the new address has to be
//! proven again.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum UserStatus {
    /// Registered with a password, email ownership not proven yet
    #[default]
    #[display("unverified")]
    Unverified = 0,

    #[display("verified")]
    Verified = 1,

    /// Cannot log in
    #[display("banned")]
    Banned = 2,
}

impl UserStatus {
    /// Get numeric ID for database storage
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> IdentityResult<Self> {
        match id {
            0 => Ok(Self::Unverified),
            1 => Ok(Self::Verified),
            2 => Ok(Self::Banned),
            _ => Err(IdentityError::Internal(format!("Invalid user_status id: {}", id))),
        }
    }

    /// The status a login attempt is judged by, after the password matched.
    pub fn ensure_can_login(&self) -> IdentityResult<()> {
        match self {
            Self::Verified => Ok(()),
            Self::Unverified => Err(IdentityError::AccountNotVerified),
            Self::Banned => Err(IdentityError::AccountBanned),
        }
    }
}
