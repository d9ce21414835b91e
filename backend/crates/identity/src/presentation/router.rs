//! Identity Routers
//!
//! `auth_router` is public; the others sit behind the authorization gate.
//! All share one [`IdentityAppState`].

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::domain::federation::IdentityVerifier;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::user_role::UserRole;
use crate::presentation::handlers::{self, IdentityAppState};
use crate::presentation::middleware::{GateState, require_principal};

fn gate<R, V>(state: &IdentityAppState<R, V>, allowed_roles: &[UserRole]) -> GateState<R> {
    GateState::new(state.repo.clone(), state.issuer.clone(), allowed_roles)
}

/// `/api/auth`
pub fn auth_router<R, V>(state: IdentityAppState<R, V>) -> Router
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    Router::new()
        .route("/register", post(handlers::register::<R, V>))
        .route("/verify-email/{token}", get(handlers::verify_email::<R, V>))
        .route("/login", post(handlers::login::<R, V>))
        .route("/google", post(handlers::google_login::<R, V>))
        .route("/forgot-password", post(handlers::forgot_password::<R, V>))
        .route("/reset-password/{token}", post(handlers::reset_password::<R, V>))
        .route("/refresh-token", post(handlers::refresh_token::<R, V>))
        .route("/logout", post(handlers::logout::<R, V>))
        .route("/resend-verification", post(handlers::resend_verification::<R, V>))
        .with_state(state)
}

/// `/api/profile`, any authenticated principal
pub fn profile_router<R, V>(state: IdentityAppState<R, V>) -> Router
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let gate = gate(&state, &[]);

    Router::new()
        .route(
            "/",
            get(handlers::get_profile).put(handlers::update_profile::<R, V>),
        )
        .route_layer(middleware::from_fn_with_state(gate, require_principal::<R>))
        .with_state(state)
}

/// `/api/user`, any authenticated principal
pub fn user_router<R, V>(state: IdentityAppState<R, V>) -> Router
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let gate = gate(&state, &[]);

    Router::new()
        .route("/set-password", post(handlers::set_password::<R, V>))
        .route("/change-password", put(handlers::change_password::<R, V>))
        .route_layer(middleware::from_fn_with_state(gate, require_principal::<R>))
        .with_state(state)
}

/// `/api/admin`, administrators only
pub fn admin_router<R, V>(state: IdentityAppState<R, V>) -> Router
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let gate = gate(&state, &[UserRole::Admin]);

    Router::new()
        .route(
            "/users/{id}/status",
            put(handlers::update_user_status::<R, V>),
        )
        .route_layer(middleware::from_fn_with_state(gate, require_principal::<R>))
        .with_state(state)
}

/// Every identity route, already nested under its `/api/...` prefix
pub fn identity_router<R, V>(state: IdentityAppState<R, V>) -> Router
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    Router::new()
        .nest("/api/auth", auth_router(state.clone()))
        .nest("/api/profile", profile_router(state.clone()))
        .nest("/api/user", user_router(state.clone()))
        .nest("/api/admin", admin_router(state))
}
