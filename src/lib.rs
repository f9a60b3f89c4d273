//! A deliberately raw SMTP (RFC 5321) client for studying sender spoofing.
//!
//! Each call to [`SmtpClient::send`] drives exactly one mail transaction over
//! one TCP connection: greeting, EHLO, opportunistic STARTTLS upgrade on the
//! same socket, optional AUTH PLAIN, envelope negotiation and raw DATA
//! injection with caller-controlled headers. The envelope sender given in
//! `MAIL FROM` is always the authentication username, while the `From:`
//! header is composed from a freely chosen display name and address. Keeping
//! those two identities independent is the divergence this crate exists to
//! demonstrate.
//!
//! There is no queueing, no retry, no pooling and no DKIM/SPF logic, on
//! purpose.

#![deny(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    missing_debug_implementations,
    clippy::unwrap_used
)]

pub mod authentication;
mod client;
mod codec;
pub mod commands;
pub mod error;
mod message;
pub mod mock;
pub mod net;
pub mod response;
mod runtime;
pub mod stream;
mod types;

pub use crate::authentication::Credentials;
pub use crate::client::{SmtpClient, DEFAULT_TIMEOUT};
pub use crate::error::{Error, Reason};
pub use crate::response::Response;
pub use crate::types::{AddressError, ClientId, EmailAddress};
