//! What an ephemeral token may be redeemed for.
//!
//! A link mailed for email verification cannot be replayed against the
//! password-reset endpoint, and vice versa.

use derive_more::Display;

use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TokenPurpose {
    #[display("email_verification")]
    EmailVerification = 0,
    #[display("password_reset")]
    PasswordReset = 1,
}

impl TokenPurpose {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> IdentityResult<Self> {
        match id {
            0 => Ok(Self::EmailVerification),
            1 => Ok(Self::PasswordReset),
            _ => Err(IdentityError::Internal(format!("Invalid token purpose id: {}", id))),
        }
    }
}
