//! Authorization Gate
//!
//! Route layer that turns `Authorization: Bearer <access token>` into a
//! [`Principal`] in the request extensions, optionally restricted to a set of
//! roles. There is no implicit refresh: an expired access token is a 401 and
//! the client calls the refresh endpoint itself.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::application::token_issuer::{TokenClass, TokenIssuer};
use crate::domain::entity::principal::Principal;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{IdentityError, IdentityResult};

/// Gate state: where principals come from and who may pass
pub struct GateState<U> {
    pub repo: Arc<U>,
    pub issuer: Arc<TokenIssuer>,
    /// Empty means any authenticated principal
    pub allowed_roles: Arc<[UserRole]>,
}

impl<U> GateState<U> {
    pub fn new(repo: Arc<U>, issuer: Arc<TokenIssuer>, allowed_roles: &[UserRole]) -> Self {
        Self {
            repo,
            issuer,
            allowed_roles: allowed_roles.into(),
        }
    }
}

impl<U> Clone for GateState<U> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            issuer: self.issuer.clone(),
            allowed_roles: self.allowed_roles.clone(),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve and authorize the caller. Pure except for the principal lookup.
async fn authorize<U>(state: &GateState<U>, headers: &HeaderMap) -> IdentityResult<Principal>
where
    U: UserRepository + Sync,
{
    let token = bearer_token(headers).ok_or(IdentityError::Unauthorized("access token missing"))?;

    let claims = state
        .issuer
        .verify(token, TokenClass::Access)
        .map_err(|_| IdentityError::Unauthorized("access token invalid or expired"))?;
    let user_id = claims
        .user_id()
        .map_err(|_| IdentityError::Unauthorized("access token invalid or expired"))?;

    let user = state
        .repo
        .find_by_id(&user_id)
        .await?
        .ok_or(IdentityError::Unauthorized("account no longer exists"))?;

    if !state.allowed_roles.is_empty() && !state.allowed_roles.contains(&user.user_role) {
        return Err(IdentityError::Forbidden("insufficient role"));
    }

    Ok(Principal::from(user))
}

/// Middleware that requires an authorized principal
pub async fn require_principal<U>(
    State(state): State<GateState<U>>,
    mut req: Request<Body>,
    next: Next,
) -> IdentityResult<Response>
where
    U: UserRepository + Send + Sync + 'static,
{
    let principal = authorize(&state, req.headers()).await?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
