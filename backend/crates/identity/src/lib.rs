//! Identity & Session Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository / notifier / verifier ports
//! - `application/` - Use cases, token issuer, ephemeral token lifecycle
//! - `infra/` - PostgreSQL and in-memory stores, Google verifier, mailers
//! - `presentation/` - HTTP handlers, DTOs, routers, authorization gate
//!
//! ## Features
//! - Email/password registration with emailed verification links
//! - Google Sign-In with auto-provisioning of verified accounts
//! - Stateless JWT sessions: short-lived access token, refresh token in an
//!   HttpOnly cookie
//! - Password reset through single-use, time-limited links
//! - Role-gated routes (student, admin)
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B length policy)
//! - Link secrets stored only as SHA-256 digests, consumed atomically
//! - Unknown email and wrong password are indistinguishable at login
//! - Separate signing keys for access and refresh tokens

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use infra::{
    GoogleIdTokenVerifier, GoogleVerifierConfig, HttpRelayNotifier, InMemoryIdentityStore,
    LogNotifier, PgIdentityStore,
};
pub use presentation::{IdentityAppState, identity_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
