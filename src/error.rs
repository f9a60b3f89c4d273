//! Error types for the transaction engine.

use std::io;

use crate::response::Response;

/// What actually went wrong underneath a failed protocol step.
#[derive(thiserror::Error, Debug)]
pub enum Reason {
    /// The server answered with a different code than the step requires
    #[error("unexpected reply: {0}")]
    UnexpectedReply(Response),
    /// A reply that could not be parsed at all
    #[error("malformed reply: {0:?}")]
    Parsing(nom::error::ErrorKind),
    /// IO error, including timeouts
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// TLS error
    #[error("tls: {0}")]
    Tls(#[from] async_native_tls::Error),
}

/// A transaction failure tagged with the protocol step it happened in.
///
/// STARTTLS refusals and QUIT failures never surface here; the engine
/// swallows both and either continues in plaintext or finishes regardless.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// TCP connection could not be established
    #[error("failed to connect")]
    Connect(#[source] Reason),
    /// The server greeting was not 220
    #[error("greeting failed")]
    Greeting(#[source] Reason),
    /// EHLO was not answered with 250
    #[error("EHLO failed")]
    Ehlo(#[source] Reason),
    /// STARTTLS was accepted but the TLS handshake fell apart
    #[error("TLS handshake failed")]
    TlsHandshake(#[source] Reason),
    /// The mandatory EHLO after a TLS upgrade was not answered with 250
    #[error("post-TLS EHLO failed")]
    PostTlsEhlo(#[source] Reason),
    /// AUTH PLAIN was not answered with 235
    #[error("AUTH PLAIN failed")]
    Auth(#[source] Reason),
    /// MAIL FROM was not answered with 250
    #[error("MAIL FROM failed")]
    MailFrom(#[source] Reason),
    /// RCPT TO was not answered with 250
    #[error("RCPT TO failed")]
    RcptTo(#[source] Reason),
    /// DATA was not answered with 354
    #[error("DATA failed")]
    Data(#[source] Reason),
    /// Writing the message content failed
    #[error("failed to write message body")]
    BodyWrite(#[source] Reason),
    /// The reply to the terminated message was not 250
    #[error("message data confirmation failed")]
    DataConfirm(#[source] Reason),
}

impl Error {
    /// The underlying transport or protocol detail.
    pub fn reason(&self) -> &Reason {
        match self {
            Error::Connect(reason)
            | Error::Greeting(reason)
            | Error::Ehlo(reason)
            | Error::TlsHandshake(reason)
            | Error::PostTlsEhlo(reason)
            | Error::Auth(reason)
            | Error::MailFrom(reason)
            | Error::RcptTo(reason)
            | Error::Data(reason)
            | Error::BodyWrite(reason)
            | Error::DataConfirm(reason) => reason,
        }
    }

    /// The reply the server actually sent, when the failure was a reply with
    /// an unexpected code.
    pub fn reply(&self) -> Option<&Response> {
        match self.reason() {
            Reason::UnexpectedReply(response) => Some(response),
            _ => None,
        }
    }
}
