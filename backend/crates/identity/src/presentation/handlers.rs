//! HTTP Handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::token_issuer::TokenIssuer;
use crate::application::{
    ChangePasswordInput, ChangePasswordUseCase, FederatedLoginUseCase, ForgotPasswordUseCase,
    LoginInput, LoginOutput, LoginUseCase, RefreshUseCase, RegisterInput, RegisterUseCase,
    ResendVerificationUseCase, ResetPasswordInput, ResetPasswordUseCase, SetPasswordUseCase,
    UpdateProfileInput, UpdateProfileUseCase, UpdateUserStatusUseCase, VerificationOutcome,
    VerifyEmailUseCase,
};
use crate::domain::entity::principal::Principal;
use crate::domain::federation::IdentityVerifier;
use crate::domain::notifier::Notifier;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::user_id::UserId;
use crate::error::{IdentityError, IdentityResult};
use crate::presentation::dto::{
    AccessTokenResponse, ChangePasswordRequest, EmailRequest, GoogleLoginRequest, LoginRequest,
    LoginResponse, MessageResponse, NewPasswordRequest, RegisterRequest, UpdateProfileRequest,
    UpdateStatusRequest, UserResponse,
};

/// JSON body whose rejection renders as a validation error
type JsonBody<T> = WithRejection<Json<T>, IdentityError>;

/// Shared state for identity handlers
pub struct IdentityAppState<R, V> {
    pub repo: Arc<R>,
    pub verifier: Arc<V>,
    pub notifier: Arc<dyn Notifier>,
    pub issuer: Arc<TokenIssuer>,
    pub config: Arc<IdentityConfig>,
}

impl<R, V> IdentityAppState<R, V> {
    pub fn new(repo: R, verifier: V, notifier: Arc<dyn Notifier>, config: IdentityConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            verifier: Arc::new(verifier),
            notifier,
            issuer: Arc::new(TokenIssuer::new(&config)),
            config: Arc::new(config),
        }
    }
}

// Arc fields: cloning never needs `R: Clone` / `V: Clone`
impl<R, V> Clone for IdentityAppState<R, V> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            verifier: self.verifier.clone(),
            notifier: self.notifier.clone(),
            issuer: self.issuer.clone(),
            config: self.config.clone(),
        }
    }
}

fn refresh_cookie(config: &IdentityConfig, token: &str) -> IdentityResult<HeaderValue> {
    config
        .refresh_cookie()
        .set_cookie_header(token)
        .map_err(|e| IdentityError::Internal(format!("refresh cookie not encodable: {e}")))
}

/// Access token in the body, refresh token in the cookie only
fn session_response(config: &IdentityConfig, output: LoginOutput) -> IdentityResult<Response> {
    let cookie = refresh_cookie(config, &output.tokens.refresh.token)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: output.tokens.access.token,
            user: output.principal,
        }),
    )
        .into_response())
}

// ============================================================================
// Registration & Verification
// ============================================================================

/// POST /api/auth/register
pub async fn register<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    WithRejection(Json(req), _): JsonBody<RegisterRequest>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case = RegisterUseCase::new(state.repo.clone(), state.notifier.clone(), state.config.clone());

    let input = RegisterInput {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        password: req.password,
        user_name: req.user_name,
    };

    use_case.execute(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Registration successful. Please check your email to verify your account.",
        )),
    ))
}

/// GET /api/auth/verify-email/{token}
pub async fn verify_email<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    Path(token): Path<String>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case = VerifyEmailUseCase::new(state.repo.clone(), state.config.clone());

    let message = match use_case.execute(&token).await? {
        VerificationOutcome::Verified => "Email verified successfully.",
        VerificationOutcome::AlreadyVerified => "This account has already been verified.",
    };

    Ok(Json(MessageResponse::new(message)))
}

/// POST /api/auth/resend-verification
pub async fn resend_verification<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    WithRejection(Json(req), _): JsonBody<EmailRequest>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case =
        ResendVerificationUseCase::new(state.repo.clone(), state.notifier.clone(), state.config.clone());

    use_case.execute(req.email).await?;

    Ok(Json(MessageResponse::new(
        "If this email is registered and awaiting verification, a new link has been sent.",
    )))
}

// ============================================================================
// Sessions
// ============================================================================

/// POST /api/auth/login
pub async fn login<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case = LoginUseCase::new(state.repo.clone(), state.issuer.clone(), state.config.clone());

    let output = use_case
        .execute(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    session_response(&state.config, output)
}

/// POST /api/auth/google
pub async fn google_login<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    WithRejection(Json(req), _): JsonBody<GoogleLoginRequest>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case =
        FederatedLoginUseCase::new(state.repo.clone(), state.verifier.clone(), state.issuer.clone());

    let output = use_case.execute(&req.token_id).await?;

    session_response(&state.config, output)
}

/// POST /api/auth/refresh-token
pub async fn refresh_token<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    headers: HeaderMap,
) -> IdentityResult<Json<AccessTokenResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let cookie = platform::cookie::extract_cookie(&headers, &state.config.refresh_cookie_name);

    let use_case = RefreshUseCase::new(state.repo.clone(), state.issuer.clone());
    let access = use_case.execute(cookie.as_deref()).await?;

    Ok(Json(AccessTokenResponse {
        access_token: access.token,
    }))
}

/// POST /api/auth/logout
///
/// Stateless: only the cookie is cleared.
pub async fn logout<R, V>(
    State(state): State<IdentityAppState<R, V>>,
) -> IdentityResult<impl IntoResponse>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let cookie = state
        .config
        .refresh_cookie()
        .delete_cookie_header()
        .map_err(|e| IdentityError::Internal(format!("refresh cookie not encodable: {e}")))?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::new("Logged out successfully.")),
    ))
}

// ============================================================================
// Password Reset
// ============================================================================

/// POST /api/auth/forgot-password
pub async fn forgot_password<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    WithRejection(Json(req), _): JsonBody<EmailRequest>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case =
        ForgotPasswordUseCase::new(state.repo.clone(), state.notifier.clone(), state.config.clone());

    use_case.execute(req.email).await?;

    Ok(Json(MessageResponse::new(
        "If the email exists, a password reset link has been sent.",
    )))
}

/// POST /api/auth/reset-password/{token}
pub async fn reset_password<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    Path(token): Path<String>,
    WithRejection(Json(req), _): JsonBody<NewPasswordRequest>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case = ResetPasswordUseCase::new(state.repo.clone(), state.config.clone());

    use_case
        .execute(ResetPasswordInput {
            token,
            new_password: req.new_password,
        })
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset successfully.")))
}

// ============================================================================
// Account (behind the gate)
// ============================================================================

/// GET /api/profile
pub async fn get_profile(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

/// PUT /api/profile
pub async fn update_profile<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    Extension(principal): Extension<Principal>,
    WithRejection(Json(req), _): JsonBody<UpdateProfileRequest>,
) -> IdentityResult<Json<UserResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case = UpdateProfileUseCase::new(state.repo.clone(), state.notifier.clone(), state.config.clone());

    let input = UpdateProfileInput {
        first_name: req.first_name,
        last_name: req.last_name,
        user_name: req.user_name,
        email: req.email,
        biography: req.biography,
        user_image: req.user_image,
    };
    let user = use_case.execute(&principal.user_id, input).await?;

    Ok(Json(UserResponse {
        message: "Profile updated successfully.".into(),
        user,
    }))
}

/// POST /api/user/set-password
pub async fn set_password<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    Extension(principal): Extension<Principal>,
    WithRejection(Json(req), _): JsonBody<NewPasswordRequest>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case = SetPasswordUseCase::new(state.repo.clone(), state.config.clone());
    use_case.execute(&principal.user_id, req.new_password).await?;

    Ok(Json(MessageResponse::new("Password set successfully.")))
}

/// PUT /api/user/change-password
pub async fn change_password<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    Extension(principal): Extension<Principal>,
    WithRejection(Json(req), _): JsonBody<ChangePasswordRequest>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let use_case = ChangePasswordUseCase::new(state.repo.clone(), state.config.clone());
    use_case
        .execute(
            &principal.user_id,
            ChangePasswordInput {
                current_password: req.current_password,
                new_password: req.new_password,
            },
        )
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully.")))
}

/// PUT /api/admin/users/{id}/status
pub async fn update_user_status<R, V>(
    State(state): State<IdentityAppState<R, V>>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): JsonBody<UpdateStatusRequest>,
) -> IdentityResult<Json<UserResponse>>
where
    R: IdentityStore,
    V: IdentityVerifier + Sync + 'static,
{
    let target: UserId = id
        .parse()
        .map_err(|_| IdentityError::Validation("Invalid user id".into()))?;

    let use_case = UpdateUserStatusUseCase::new(state.repo.clone());
    let user = use_case.execute(&actor.user_id, &target, req.status).await?;

    Ok(Json(UserResponse {
        message: "User status updated successfully.".into(),
        user,
    }))
}
