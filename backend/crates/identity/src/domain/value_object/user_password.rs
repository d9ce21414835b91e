//! User Password Value Object
//!
//! Domain wrappers around `platform::password`:
//! - [`RawPassword`]: submitted clear text, zeroized on drop
//! - [`UserPassword`]: Argon2id PHC string, the only form that is stored

use platform::password::{ClearTextPassword, HashedPassword};
use std::fmt;

use crate::error::{IdentityError, IdentityResult};

// ============================================================================
// Raw Password (User Input)
// ============================================================================

pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// A password being chosen (sign-up, reset, set, change): policy applies.
    pub fn new(raw: String) -> IdentityResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|e| IdentityError::Validation(e.to_string()))
    }

    /// A password being checked (login, current password): normalized only,
    /// so a guess never learns which policy rule it broke.
    pub fn for_verification(raw: String) -> Self {
        Self(ClearTextPassword::for_verification(raw))
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> IdentityResult<Self> {
        raw.0
            .hash(pepper)
            .map(Self)
            .map_err(|e| IdentityError::Internal(e.to_string()))
    }

    /// Create from database value
    pub fn from_db(phc: impl Into<String>) -> IdentityResult<Self> {
        HashedPassword::from_phc_string(phc)
            .map(Self)
            .map_err(|e| IdentityError::Internal(format!("Stored password hash is unreadable: {}", e)))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Constant-time, salted comparison
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }

    /// Burn the cost of one verification when there is no stored hash, so an
    /// unknown email takes as long as a wrong password.
    pub fn verify_nothing(raw: &RawPassword, pepper: Option<&[u8]>) {
        HashedPassword::verify_dummy(&raw.0, pepper);
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserPassword").field(&"[HASH]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_applies_only_when_choosing() {
        assert!(matches!(
            RawPassword::new("short".to_string()),
            Err(IdentityError::Validation(_))
        ));
        // Login-side construction never fails
        let _ = RawPassword::for_verification("short".to_string());
    }

    #[test]
    fn test_hash_verify_and_db_roundtrip() {
        let raw = RawPassword::new("secret123".to_string()).unwrap();
        let hashed = UserPassword::from_raw(&raw, Some(b"pepper")).unwrap();

        let restored = UserPassword::from_db(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&RawPassword::for_verification("secret123".into()), Some(b"pepper")));
        assert!(!restored.verify(&RawPassword::for_verification("secret124".into()), Some(b"pepper")));
        assert!(UserPassword::from_db("plaintext").is_err());
    }
}
