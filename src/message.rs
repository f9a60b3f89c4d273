//! Outbound message composition.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;

use crate::types::EmailAddress;

/// Domain suffix for generated Message-ID headers.
const MESSAGE_ID_DOMAIN: &str = "localhost";

/// Builds the fixed header block, a blank line and the body.
///
/// The From header takes the display name and address separately, so the
/// identity shown to the recipient may diverge entirely from the envelope
/// sender negotiated in MAIL FROM. Callers are responsible for keeping raw
/// CR/LF out of the name, subject and body-independent fields before this
/// point.
pub(crate) fn compose(
    sender_name: &str,
    sender_email: &str,
    recipient: &EmailAddress,
    subject: &str,
    body: &str,
) -> String {
    let headers = [
        format!("From: {} <{}>", sender_name, sender_email),
        format!("To: {}", recipient),
        format!("Subject: {}", subject),
        format!("Date: {}", Local::now().to_rfc2822()),
        format!("Message-ID: <{}@{}>", nanos_since_epoch(), MESSAGE_ID_DOMAIN),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/plain; charset=UTF-8".to_string(),
    ];

    format!("{}\r\n\r\n{}", headers.join("\r\n"), body)
}

// High-resolution stamp making the Message-ID locally unique.
fn nanos_since_epoch() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
}
