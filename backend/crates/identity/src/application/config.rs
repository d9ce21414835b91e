//! Application Configuration
//!
//! Built once by the binary and shared behind an `Arc`. Nothing in the
//! identity core reads the process environment.

use std::fmt;
use std::time::Duration;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;
use platform::cookie::CookieConfig;

/// HMAC signing key. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// 32 bytes from the OS CSPRNG
    pub fn random() -> Self {
        Self(platform::crypto::random_bytes(32))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED; {}])", self.0.len())
    }
}

/// Identity application configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Key for access tokens; never used for refresh tokens
    pub access_token_secret: SigningSecret,
    /// Key for refresh tokens; never used for access tokens
    pub refresh_token_secret: SigningSecret,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Lifetime of verification / reset links
    pub ephemeral_token_ttl: Duration,
    pub refresh_cookie_name: String,
    /// `Secure` attribute on the refresh cookie (on in production)
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Front-end origin used to build the links in outgoing mail
    pub client_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            access_token_secret: SigningSecret::new(Vec::new()),
            refresh_token_secret: SigningSecret::new(Vec::new()),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600),
            ephemeral_token_ttl: Duration::from_secs(3600),
            refresh_cookie_name: "refreshToken".to_string(),
            cookie_secure: true,
            cookie_same_site: SameSite::Strict,
            password_pepper: None,
            client_url: "http://localhost:5173".to_string(),
        }
    }
}

impl IdentityConfig {
    /// Create config with random signing secrets (tokens die with the process)
    pub fn with_random_secrets() -> Self {
        Self {
            access_token_secret: SigningSecret::random(),
            refresh_token_secret: SigningSecret::random(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secrets()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Cookie that carries the refresh token. Its lifetime matches the
    /// refresh token's own expiry.
    pub fn refresh_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.refresh_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age: Some(self.refresh_token_ttl),
        }
    }

    /// `{client_url}/{path}/{token}` without doubled slashes
    pub fn client_link(&self, path: &str, token: &str) -> String {
        format!("{}/{}/{}", self.client_url.trim_end_matches('/'), path, token)
    }
}
