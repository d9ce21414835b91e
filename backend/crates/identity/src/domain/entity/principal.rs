//! The authenticated identity attached to a request.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entity::user::User;
use crate::domain::value_object::{
    user_id::UserId, user_role::UserRole, user_status::UserStatus,
};

/// A [`User`] with the password hash stripped. This is the only shape in
/// which an account ever leaves the identity core.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "id", serialize_with = "serialize_user_id")]
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub user_image: Option<String>,
    pub biography: Option<String>,
    /// Lets clients offer "set password" to federation-only accounts
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn serialize_user_id<S: serde::Serializer>(id: &UserId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        let has_password = user.has_password();
        Self {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            user_name: user.user_name.into(),
            email: user.email.as_str().to_owned(),
            role: user.user_role,
            status: user.user_status,
            user_image: user.user_image,
            biography: user.biography,
            has_password,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
