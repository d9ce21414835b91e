//! Outgoing mail templates

use crate::application::config::IdentityConfig;
use crate::domain::entity::user::User;
use crate::domain::notifier::OutboundEmail;

pub fn verification_email(config: &IdentityConfig, user: &User, secret: &str) -> OutboundEmail {
    let link = config.client_link("verify-email", secret);
    let minutes = config.ephemeral_token_ttl.as_secs() / 60;
    OutboundEmail {
        to: user.email.as_str().to_owned(),
        subject: "Verify your email".to_owned(),
        html_body: format!(
            "<p>Hi {name},</p>\
             <p>Please confirm your email address to activate your account.</p>\
             <p><a href=\"{link}\">Verify email</a></p>\
             <p>This link expires in {minutes} minutes and can be used once.</p>",
            name = escape_html(&user.first_name),
        ),
    }
}

pub fn password_reset_email(config: &IdentityConfig, user: &User, secret: &str) -> OutboundEmail {
    let link = config.client_link("reset-password", secret);
    let minutes = config.ephemeral_token_ttl.as_secs() / 60;
    OutboundEmail {
        to: user.email.as_str().to_owned(),
        subject: "Reset your password".to_owned(),
        html_body: format!(
            "<p>Hi {name},</p>\
             <p>We received a request to reset your password.</p>\
             <p><a href=\"{link}\">Choose a new password</a></p>\
             <p>This link expires in {minutes} minutes. If you did not ask for it, ignore this email.</p>",
            name = escape_html(&user.first_name),
        ),
    }
}

/// Names are user input and end up inside HTML.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
