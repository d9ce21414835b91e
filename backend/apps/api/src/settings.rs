//! Runtime settings, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use identity::application::config::{IdentityConfig, SigningSecret};
use identity::infra::GoogleVerifierConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";

pub struct MailRelay {
    pub url: String,
    pub token: Option<String>,
}

pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub identity: IdentityConfig,
    pub google: GoogleVerifierConfig,
    /// `None` logs outgoing mail instead of sending it
    pub mail_relay: Option<MailRelay>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// `lookup` returns `None` for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let production = lookup("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));

        let access_token_secret = signing_secret(&lookup, "JWT_ACCESS_SECRET")?;
        let refresh_token_secret = signing_secret(&lookup, "JWT_REFRESH_SECRET")?;
        if access_token_secret == refresh_token_secret {
            bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let mut identity = IdentityConfig {
            access_token_secret,
            refresh_token_secret,
            cookie_secure: production,
            password_pepper: lookup("PASSWORD_PEPPER").map(String::into_bytes),
            ..IdentityConfig::default()
        };
        if let Some(raw) = lookup("ACCESS_TOKEN_EXPIRES_IN") {
            identity.access_token_ttl =
                parse_duration(&raw).context("ACCESS_TOKEN_EXPIRES_IN is invalid")?;
        }
        if let Some(raw) = lookup("REFRESH_TOKEN_EXPIRES_IN") {
            identity.refresh_token_ttl =
                parse_duration(&raw).context("REFRESH_TOKEN_EXPIRES_IN is invalid")?;
        }
        if let Some(client_url) = lookup("CLIENT_URL") {
            identity.client_url = client_url;
        }

        let google = GoogleVerifierConfig::new(lookup("GOOGLE_CLIENT_ID").unwrap_or_default());

        let mail_relay = lookup("MAIL_RELAY_URL").map(|url| MailRelay {
            url,
            token: lookup("MAIL_RELAY_TOKEN"),
        });

        Ok(Self {
            database_url,
            bind_addr,
            identity,
            google,
            mail_relay,
        })
    }
}

/// Release builds refuse to start without a secret; debug builds make one up.
fn signing_secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<SigningSecret> {
    match lookup(key) {
        Some(value) => Ok(SigningSecret::new(value.into_bytes())),
        None if cfg!(debug_assertions) => {
            tracing::warn!(key, "Signing secret not set, using a random one for this run");
            Ok(SigningSecret::random())
        }
        None => Err(anyhow!("{key} must be set")),
    }
}

/// `"3600"` (seconds), `"30s"`, `"15m"`, `"12h"`, `"7d"`
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: u64 = number
        .parse()
        .with_context(|| format!("'{raw}' does not start with a number"))?;

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => bail!("unknown duration unit '{other}'"),
    };
    if value == 0 {
        bail!("duration must be positive");
    }

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("'{raw}' is out of range"))
}
