//! Identity federation port.

use crate::error::IdentityResult;

/// Claims taken from a provider assertion after its signature, audience,
/// issuer and expiry have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    /// Provider-scoped subject identifier
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[trait_variant::make(IdentityVerifier: Send)]
pub trait LocalIdentityVerifier {
    /// Validate an externally issued ID token.
    ///
    /// Invalid assertions fail with `FederationRejected`; an unreachable
    /// provider fails with `Upstream`.
    async fn verify(&self, assertion: &str) -> IdentityResult<FederatedIdentity>;
}
