//! Refresh Use Case
//!
//! Exchanges a refresh token (from its cookie) for a new access token. The
//! refresh token itself is not rotated. The role is re-read from the store,
//! so a promotion or demotion takes effect on the next refresh.

use std::sync::Arc;

use crate::application::token_issuer::{MintedToken, TokenClass, TokenIssuer};
use crate::domain::repository::UserRepository;
use crate::error::{IdentityError, IdentityResult};

pub struct RefreshUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    issuer: Arc<TokenIssuer>,
}

impl<U> RefreshUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, issuer: Arc<TokenIssuer>) -> Self {
        Self { user_repo, issuer }
    }

    pub async fn execute(&self, refresh_token: Option<&str>) -> IdentityResult<MintedToken> {
        let refresh_token =
            refresh_token.ok_or(IdentityError::Unauthorized("refresh token missing"))?;

        let claims = self
            .issuer
            .verify(refresh_token, TokenClass::Refresh)
            .map_err(|_| IdentityError::Forbidden("refresh token invalid or expired"))?;
        let user_id = claims
            .user_id()
            .map_err(|_| IdentityError::Forbidden("refresh token invalid or expired"))?;

        let user = self
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(IdentityError::Unauthorized("account no longer exists"))?;

        let access = self
            .issuer
            .mint(&user.user_id, user.user_role, TokenClass::Access)?;

        tracing::debug!(user_id = %user.user_id, "Access token refreshed");
        Ok(access)
    }
}
