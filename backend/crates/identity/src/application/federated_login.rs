//! Federated Login Use Case
//!
//! Sign-in with a Google ID token. An existing account is matched by email;
//! an unknown email is provisioned as a verified, password-less student.
//! Existing password, role and status are never overwritten here.

use std::sync::Arc;

use crate::application::login::LoginOutput;
use crate::application::token_issuer::TokenIssuer;
use crate::domain::entity::{principal::Principal, user::User};
use crate::domain::federation::{FederatedIdentity, IdentityVerifier};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, user_name::UserName, user_status::UserStatus};
use crate::error::{IdentityError, IdentityResult};

const USER_NAME_ATTEMPTS: usize = 3;

pub struct FederatedLoginUseCase<U, V>
where
    U: UserRepository,
    V: IdentityVerifier,
{
    user_repo: Arc<U>,
    verifier: Arc<V>,
    issuer: Arc<TokenIssuer>,
}

impl<U, V> FederatedLoginUseCase<U, V>
where
    U: UserRepository,
    V: IdentityVerifier,
{
    pub fn new(user_repo: Arc<U>, verifier: Arc<V>, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            user_repo,
            verifier,
            issuer,
        }
    }

    pub async fn execute(&self, assertion: &str) -> IdentityResult<LoginOutput> {
        let assertion = assertion.trim();
        if assertion.is_empty() {
            return Err(IdentityError::Validation("Google credential is required".into()));
        }

        let identity = self.verifier.verify(assertion).await?;
        if !identity.email_verified {
            return Err(IdentityError::FederationRejected(
                "email address is not verified by the provider".into(),
            ));
        }
        let email = Email::new(identity.email.as_str())
            .map_err(|_| IdentityError::FederationRejected("email address is malformed".into()))?;

        let user = match self.user_repo.find_by_email(&email).await? {
            Some(user) => user,
            None => self.provision(email, &identity).await?,
        };

        // An unverified local account has not proven it owns this address, so
        // the provider's proof is not enough to hand it a session.
        match user.user_status {
            UserStatus::Verified => {}
            UserStatus::Unverified => return Err(IdentityError::AccountNotVerified),
            UserStatus::Banned => return Err(IdentityError::AccountBanned),
        }

        let tokens = self.issuer.mint_pair(&user.user_id, user.user_role)?;

        tracing::info!(user_id = %user.user_id, "User logged in via Google");

        Ok(LoginOutput {
            tokens,
            principal: Principal::from(user),
        })
    }

    async fn provision(&self, email: Email, identity: &FederatedIdentity) -> IdentityResult<User> {
        let first_name = identity
            .given_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.local_part())
            .to_owned();
        let last_name = identity
            .family_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_owned();

        for _ in 0..USER_NAME_ATTEMPTS {
            let user = User::provision_federated(
                first_name.clone(),
                last_name.clone(),
                UserName::generate_from_local_part(email.local_part())?,
                email.clone(),
                identity.picture.clone(),
            );

            match self.user_repo.create(&user).await {
                Ok(()) => {
                    tracing::info!(
                        user_id = %user.user_id,
                        subject = %identity.subject,
                        "Federated account provisioned"
                    );
                    return Ok(user);
                }
                Err(IdentityError::DuplicateUsername) => continue,
                // Lost a race with a concurrent first login for the same email
                Err(IdentityError::DuplicateEmail) => {
                    return self
                        .user_repo
                        .find_by_email(&email)
                        .await?
                        .ok_or_else(|| IdentityError::Internal("provisioned account vanished".into()));
                }
                Err(e) => return Err(e),
            }
        }

        Err(IdentityError::Internal(
            "could not generate a unique user name".into(),
        ))
    }
}
