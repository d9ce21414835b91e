//! User Role Value Object
//!
//! Roles are a fixed two-valued set. Authorization is plain set membership
//! (see the authorization gate), there is no hierarchy between them.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum UserRole {
    #[default]
    #[display("student")]
    Student = 0,
    #[display("admin")]
    Admin = 1,
}

impl UserRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> IdentityResult<Self> {
        match id {
            0 => Ok(UserRole::Student),
            1 => Ok(UserRole::Admin),
            _ => Err(IdentityError::Internal(format!("Invalid user_role id: {}", id))),
        }
    }
}
