//! User Entity
//!
//! The credential record. Everything the identity flows read or write about
//! an account lives here; `enrolledCourses` and other catalog relations are
//! derived views owned elsewhere.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    email::Email, user_id::UserId, user_name::UserName, user_password::UserPassword,
    user_role::UserRole, user_status::UserStatus,
};

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    /// Unique public handle
    pub user_name: UserName,
    /// Unique login identifier
    pub email: Email,
    /// `None` for accounts provisioned through federation that never set one
    pub password_hash: Option<UserPassword>,
    pub user_role: UserRole,
    pub user_status: UserStatus,
    pub user_image: Option<String>,
    pub biography: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Self-service registration: student, unverified, with a password.
    pub fn register(
        first_name: String,
        last_name: String,
        user_name: UserName,
        email: Email,
        password_hash: UserPassword,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            first_name,
            last_name,
            user_name,
            email,
            password_hash: Some(password_hash),
            user_role: UserRole::default(),
            user_status: UserStatus::default(),
            user_image: None,
            biography: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Auto-provisioned on first federated login: the provider already proved
    /// email ownership, so the account starts verified and without a password.
    pub fn provision_federated(
        first_name: String,
        last_name: String,
        user_name: UserName,
        email: Email,
        user_image: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            first_name,
            last_name,
            user_name,
            email,
            password_hash: None,
            user_role: UserRole::default(),
            user_status: UserStatus::Verified,
            user_image,
            biography: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Apply the fields present in `patch`. Uniqueness is the store's job.
    pub fn apply_patch(&mut self, patch: &ProfilePatch) {
        if let Some(first_name) = &patch.first_name {
            self.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &patch.last_name {
            self.last_name.clone_from(last_name);
        }
        if let Some(user_name) = &patch.user_name {
            self.user_name = user_name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(biography) = &patch.biography {
            self.biography = Some(biography.clone());
        }
        if let Some(user_image) = &patch.user_image {
            self.user_image = Some(user_image.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Optional-field profile update. `None` means "leave as is".
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<UserName>,
    pub email: Option<Email>,
    pub biography: Option<String>,
    pub user_image: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.user_name.is_none()
            && self.email.is_none()
            && self.biography.is_none()
            && self.user_image.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::user_password::RawPassword;

    fn sample_user() -> User {
        let raw = RawPassword::new("secret123".to_string()).unwrap();
        User::register(
            "Ada".into(),
            "Lovelace".into(),
            UserName::new("ada").unwrap(),
            Email::new("ada@example.com").unwrap(),
            UserPassword::from_raw(&raw, None).unwrap(),
        )
    }

    #[test]
    fn test_register_defaults() {
        let user = sample_user();
        assert_eq!(user.user_role, UserRole::Student);
        assert_eq!(user.user_status, UserStatus::Unverified);
        assert!(user.has_password());
    }

    #[test]
    fn test_federated_accounts_start_verified_without_password() {
        let user = User::provision_federated(
            "Ada".into(),
            String::new(),
            UserName::new("ada_1f2e3d4c").unwrap(),
            Email::new("ada@example.com").unwrap(),
            Some("https://example.com/ada.png".into()),
        );
        assert_eq!(user.user_status, UserStatus::Verified);
        assert!(!user.has_password());
        assert!(user.user_image.is_some());
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut user = sample_user();
        let patch = ProfilePatch {
            biography: Some("Analyst".into()),
            ..Default::default()
        };
        user.apply_patch(&patch);
        assert_eq!(user.biography.as_deref(), Some("Analyst"));
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.email.as_str(), "ada@example.com");
        assert!(ProfilePatch::default().is_empty());
        assert!(!patch.is_empty());
    }
}
