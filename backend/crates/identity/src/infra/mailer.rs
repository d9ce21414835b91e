//! Notifier implementations
//!
//! Delivery is fire-and-forget: a send never blocks or fails the request
//! that triggered it. Failures are logged.

use serde::Serialize;

use crate::domain::notifier::{Notifier, OutboundEmail};
use crate::error::{IdentityError, IdentityResult};

/// Writes outgoing mail to the log instead of delivering it. For local runs.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, email: OutboundEmail) {
        tracing::info!(to = %email.to, subject = %email.subject, "Outgoing email (not delivered)");
        tracing::debug!(body = %email.html_body, "Outgoing email body");
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Posts each message as JSON to an HTTP mail relay.
#[derive(Clone)]
pub struct HttpRelayNotifier {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpRelayNotifier {
    pub fn new(url: impl Into<String>, token: Option<String>) -> IdentityResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            token,
        })
    }

    async fn deliver(&self, email: &OutboundEmail) -> Result<(), reqwest::Error> {
        let mut request = self.http.post(&self.url).json(&RelayPayload {
            to: &email.to,
            subject: &email.subject,
            html: &email.html_body,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

impl Notifier for HttpRelayNotifier {
    fn send(&self, email: OutboundEmail) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(to = %email.to, "No async runtime, email dropped");
            return;
        };

        let notifier = self.clone();
        runtime.spawn(async move {
            match notifier.deliver(&email).await {
                Ok(()) => tracing::debug!(to = %email.to, "Email handed to relay"),
                Err(e) => tracing::warn!(to = %email.to, error = %e, "Email delivery failed"),
            }
        });
    }
}

/// Keeps every message in memory so tests can read links back out.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Arc<std::sync::Mutex<Vec<OutboundEmail>>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Secret from the most recent `{path}/{secret}` link mailed to `to`.
    pub fn last_secret(&self, to: &str, path: &str) -> Option<String> {
        let marker = format!("/{path}/");
        self.sent()
            .iter()
            .rev()
            .filter(|m| m.to == to)
            .find_map(|m| {
                let start = m.html_body.find(&marker)? + marker.len();
                let secret: String = m.html_body[start..]
                    .chars()
                    .take_while(char::is_ascii_hexdigit)
                    .collect();
                Some(secret)
            })
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn send(&self, email: OutboundEmail) {
        self.sent.lock().unwrap().push(email);
    }
}
