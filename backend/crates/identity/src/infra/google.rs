//! Google ID token verification
//!
//! Checks an ID token issued by Google Sign-In against Google's published
//! signing keys: RS256 signature, `aud` equal to our client id, `iss` one of
//! Google's issuers, and `exp`. The key set is cached and refetched when it
//! goes stale or a token names a key we have not seen.

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Deserializer};
use tokio::sync::RwLock;

use crate::domain::federation::{FederatedIdentity, IdentityVerifier};
use crate::error::{IdentityError, IdentityResult};

pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Unknown `kid`s never trigger more than one refetch per interval
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GoogleVerifierConfig {
    /// OAuth client id; tokens must carry it as `aud`. Empty disables Google sign-in.
    pub client_id: String,
    pub jwks_url: String,
    pub issuers: Vec<String>,
    pub keys_ttl: Duration,
    pub http_timeout: Duration,
}

impl GoogleVerifierConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
            keys_ttl: Duration::from_secs(60 * 60),
            http_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    email_verified: bool,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Older tokens carry `"email_verified": "true"`
fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

pub struct GoogleIdTokenVerifier {
    http: reqwest::Client,
    config: GoogleVerifierConfig,
    validation: Validation,
    cache: RwLock<Option<CachedKeys>>,
}

impl GoogleIdTokenVerifier {
    pub fn new(config: GoogleVerifierConfig) -> IdentityResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| IdentityError::Internal(format!("failed to build HTTP client: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[config.client_id.as_str()]);
        validation.set_issuer(&config.issuers[..]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Ok(Self {
            http,
            config,
            validation,
            cache: RwLock::new(None),
        })
    }

    async fn fetch_keys(&self) -> IdentityResult<JwkSet> {
        let response = self
            .http
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::Upstream(format!("Google key fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Upstream(format!(
                "Google key endpoint returned status: {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::Upstream(format!("Google key set unreadable: {e}")))
    }

    async fn key_for(&self, kid: &str) -> IdentityResult<Jwk> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let fresh = cached.fetched_at.elapsed() < self.config.keys_ttl;
                if fresh {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(jwk.clone());
                    }
                    if cached.fetched_at.elapsed() < MIN_REFETCH_INTERVAL {
                        return Err(IdentityError::FederationRejected("unknown signing key".into()));
                    }
                }
            }
        }

        let keys = self.fetch_keys().await?;
        tracing::debug!(keys = keys.keys.len(), "Google signing keys refreshed");

        let jwk = keys.find(kid).cloned();
        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        jwk.ok_or_else(|| IdentityError::FederationRejected("unknown signing key".into()))
    }
}

impl IdentityVerifier for GoogleIdTokenVerifier {
    async fn verify(&self, assertion: &str) -> IdentityResult<FederatedIdentity> {
        if self.config.client_id.is_empty() {
            return Err(IdentityError::FederationRejected(
                "Google sign-in is not configured".into(),
            ));
        }

        let header = decode_header(assertion)
            .map_err(|e| IdentityError::FederationRejected(format!("malformed token: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::FederationRejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::FederationRejected("token has no key id".into()))?;

        let jwk = self.key_for(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| IdentityError::FederationRejected(format!("unusable signing key: {e}")))?;

        let claims = decode::<GoogleClaims>(assertion, &key, &self.validation)
            .map_err(|e| IdentityError::FederationRejected(e.to_string()))?
            .claims;

        let email = claims
            .email
            .ok_or_else(|| IdentityError::FederationRejected("token carries no email".into()))?;

        Ok(FederatedIdentity {
            subject: claims.sub,
            email,
            email_verified: claims.email_verified,
            given_name: claims.given_name,
            family_name: claims.family_name,
            picture: claims.picture,
        })
    }
}
