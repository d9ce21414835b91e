//! Domain Layer
//!
//! Entities, value objects, and the ports the application layer talks to:
//! repositories, the notifier and the federation verifier.

pub mod entity;
pub mod federation;
pub mod notifier;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{ephemeral_token::EphemeralToken, principal::Principal, user::User};
pub use federation::{FederatedIdentity, IdentityVerifier};
pub use notifier::{Notifier, OutboundEmail};
pub use repository::{EphemeralTokenRepository, IdentityStore, UserRepository};
