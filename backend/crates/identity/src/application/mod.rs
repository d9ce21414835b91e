//! Application Layer
//!
//! Use cases and application services.

pub mod account;
pub mod config;
pub mod ephemeral_token;
pub mod federated_login;
pub mod login;
pub mod mail;
pub mod password_reset;
pub mod refresh;
pub mod register;
pub mod resend_verification;
pub mod token_issuer;
pub mod verify_email;

// Re-exports
pub use account::{
    ChangePasswordInput, ChangePasswordUseCase, SetPasswordUseCase, UpdateProfileInput,
    UpdateProfileUseCase, UpdateUserStatusUseCase,
};
pub use config::{IdentityConfig, SigningSecret};
pub use ephemeral_token::{EphemeralTokenService, IssuedToken};
pub use federated_login::FederatedLoginUseCase;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use password_reset::{ForgotPasswordUseCase, ResetPasswordInput, ResetPasswordUseCase};
pub use refresh::RefreshUseCase;
pub use register::{RegisterInput, RegisterOutput, RegisterUseCase};
pub use resend_verification::ResendVerificationUseCase;
pub use token_issuer::{MintedToken, SessionClaims, TokenClass, TokenError, TokenIssuer, TokenPair};
pub use verify_email::{VerificationOutcome, VerifyEmailUseCase};
