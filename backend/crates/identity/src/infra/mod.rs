//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod google;
pub mod mailer;
pub mod memory;
pub mod postgres;

pub use google::{GoogleIdTokenVerifier, GoogleVerifierConfig};
pub use mailer::{HttpRelayNotifier, LogNotifier};
pub use memory::InMemoryIdentityStore;
pub use postgres::PgIdentityStore;
