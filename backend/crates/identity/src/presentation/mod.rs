//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::IdentityAppState;
pub use middleware::{GateState, require_principal};
pub use router::{admin_router, auth_router, identity_router, profile_router, user_router};
