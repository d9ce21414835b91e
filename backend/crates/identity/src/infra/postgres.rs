//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    ephemeral_token::EphemeralToken,
    user::{ProfilePatch, User},
};
use crate::domain::repository::{EphemeralTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, token_purpose::TokenPurpose, user_id::UserId, user_name::UserName,
    user_password::UserPassword, user_role::UserRole, user_status::UserStatus,
};
use crate::error::{IdentityError, IdentityResult};

/// Unique constraint names from the identity migration
const USERS_EMAIL_KEY: &str = "users_email_key";
const USERS_USER_NAME_KEY: &str = "users_user_name_key";

/// PostgreSQL-backed identity store
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turn a unique violation on `users` into the matching domain error.
fn map_user_write_error(err: sqlx::Error) -> IdentityError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(USERS_EMAIL_KEY) => return IdentityError::DuplicateEmail,
                Some(USERS_USER_NAME_KEY) => return IdentityError::DuplicateUsername,
                _ => {}
            }
        }
    }
    IdentityError::Database(err)
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgIdentityStore {
    async fn create(&self, user: &User) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                first_name,
                last_name,
                user_name,
                email,
                password_hash,
                user_role,
                user_status,
                user_image,
                biography,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.user_name.as_str())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_ref().map(|h| h.as_phc_string()))
        .bind(user.user_role.id())
        .bind(user.user_status.id())
        .bind(&user.user_image)
        .bind(&user.biography)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_user_write_error)?;

        Ok(())
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                user_id,
                first_name,
                last_name,
                user_name,
                email,
                password_hash,
                user_role,
                user_status,
                user_image,
                biography,
                created_at,
                updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                user_id,
                first_name,
                last_name,
                user_name,
                email,
                password_hash,
                user_role,
                user_status,
                user_image,
                biography,
                created_at,
                updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn update_status(&self, user_id: &UserId, status: UserStatus) -> IdentityResult<()> {
        let updated = sqlx::query(
            "UPDATE users SET user_status = $2, updated_at = $3 WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .bind(status.id())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(IdentityError::UserNotFound);
        }
        Ok(())
    }

    async fn update_profile(&self, user_id: &UserId, patch: &ProfilePatch) -> IdentityResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                user_name = COALESCE($4, user_name),
                email = COALESCE($5, email),
                biography = COALESCE($6, biography),
                user_image = COALESCE($7, user_image),
                updated_at = $8
            WHERE user_id = $1
            RETURNING
                user_id,
                first_name,
                last_name,
                user_name,
                email,
                password_hash,
                user_role,
                user_status,
                user_image,
                biography,
                created_at,
                updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(patch.first_name.as_deref())
        .bind(patch.last_name.as_deref())
        .bind(patch.user_name.as_ref().map(|n| n.as_str()))
        .bind(patch.email.as_ref().map(|e| e.as_str()))
        .bind(patch.biography.as_deref())
        .bind(patch.user_image.as_deref())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_write_error)?;

        row.ok_or(IdentityError::UserNotFound)?.into_user()
    }

    async fn set_password_hash(&self, user_id: &UserId, hash: &UserPassword) -> IdentityResult<()> {
        let updated = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = $3 WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .bind(hash.as_phc_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(IdentityError::UserNotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Ephemeral Token Repository Implementation
// ============================================================================

impl EphemeralTokenRepository for PgIdentityStore {
    async fn replace_for_user(&self, token: &EphemeralToken) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ephemeral_tokens (
                user_id,
                token_hash,
                purpose,
                created_at,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                token_hash = EXCLUDED.token_hash,
                purpose = EXCLUDED.purpose,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(token.user_id.as_uuid())
        .bind(&token.token_hash)
        .bind(token.purpose.id())
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> IdentityResult<Option<EphemeralToken>> {
        // DELETE ... RETURNING: of two concurrent redeemers, only one gets the row
        let row = sqlx::query_as::<_, EphemeralTokenRow>(
            r#"
            DELETE FROM ephemeral_tokens
            WHERE token_hash = $1 AND purpose = $2 AND expires_at > $3
            RETURNING
                user_id,
                token_hash,
                purpose,
                created_at,
                expires_at
            "#,
        )
        .bind(token_hash)
        .bind(purpose.id())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_token()).transpose()
    }

    async fn delete_for_user(&self, user_id: &UserId) -> IdentityResult<u64> {
        let deleted = sqlx::query("DELETE FROM ephemeral_tokens WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> IdentityResult<u64> {
        let deleted = sqlx::query("DELETE FROM ephemeral_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    first_name: String,
    last_name: String,
    user_name: String,
    email: String,
    password_hash: Option<String>,
    user_role: i16,
    user_status: i16,
    user_image: Option<String>,
    biography: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> IdentityResult<User> {
        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            first_name: self.first_name,
            last_name: self.last_name,
            user_name: UserName::from_db(self.user_name),
            email: Email::from_db(self.email),
            password_hash: self.password_hash.map(UserPassword::from_db).transpose()?,
            user_role: UserRole::from_id(self.user_role)?,
            user_status: UserStatus::from_id(self.user_status)?,
            user_image: self.user_image,
            biography: self.biography,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EphemeralTokenRow {
    user_id: Uuid,
    token_hash: String,
    purpose: i16,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl EphemeralTokenRow {
    fn into_token(self) -> IdentityResult<EphemeralToken> {
        Ok(EphemeralToken {
            user_id: UserId::from_uuid(self.user_id),
            token_hash: self.token_hash,
            purpose: TokenPurpose::from_id(self.purpose)?,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}
