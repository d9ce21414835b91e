//! Login Use Case
//!
//! Password login. Checks run in a fixed order so that the response for an
//! unknown email and a wrong password are indistinguishable:
//!
//! 1. look up by email (unknown → burn a hash, `InvalidCredential`)
//! 2. no stored hash → `FederatedAccount`
//! 3. verify password → `InvalidCredential`
//! 4. account status → `AccountNotVerified` / `AccountBanned`
//! 5. mint the token pair

use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::token_issuer::{TokenIssuer, TokenPair};
use crate::domain::entity::principal::Principal;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{IdentityError, IdentityResult};

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Login output, shared with federated login
#[derive(Debug)]
pub struct LoginOutput {
    pub tokens: TokenPair,
    pub principal: Principal,
}

/// Login use case
pub struct LoginUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    issuer: Arc<TokenIssuer>,
    config: Arc<IdentityConfig>,
}

impl<U> LoginUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, issuer: Arc<TokenIssuer>, config: Arc<IdentityConfig>) -> Self {
        Self {
            user_repo,
            issuer,
            config,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> IdentityResult<LoginOutput> {
        if input.password.is_empty() {
            return Err(IdentityError::Validation("Password is required".into()));
        }
        let email = Email::new(input.email)?;
        let raw_password = RawPassword::for_verification(input.password);
        let pepper = self.config.pepper();

        let Some(user) = self.user_repo.find_by_email(&email).await? else {
            UserPassword::verify_nothing(&raw_password, pepper);
            tracing::debug!("Login attempt for unknown email");
            return Err(IdentityError::InvalidCredential);
        };

        let Some(password_hash) = &user.password_hash else {
            return Err(IdentityError::FederatedAccount);
        };

        if !password_hash.verify(&raw_password, pepper) {
            tracing::debug!(user_id = %user.user_id, "Login attempt with wrong password");
            return Err(IdentityError::InvalidCredential);
        }

        user.user_status.ensure_can_login()?;

        let tokens = self.issuer.mint_pair(&user.user_id, user.user_role)?;

        tracing::info!(user_id = %user.user_id, "User logged in");

        Ok(LoginOutput {
            tokens,
            principal: Principal::from(user),
        })
    }
}
