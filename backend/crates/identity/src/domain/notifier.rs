//! Outbound mail port.

/// A rendered email, ready to hand to a delivery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Fire-and-forget delivery.
///
/// `send` returns immediately. Implementations own retries, timeouts and
/// error logging; a failed delivery never fails the flow that triggered it.
pub trait Notifier: Send + Sync + 'static {
    fn send(&self, email: OutboundEmail);
}
