//! SMTP commands, formatted on the wire through `Display`.

use std::fmt::{self, Display, Formatter};

use crate::authentication::Credentials;
use crate::types::{ClientId, EmailAddress};

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct EhloCommand {
    client_id: ClientId,
}

impl EhloCommand {
    pub fn new(client_id: ClientId) -> EhloCommand {
        EhloCommand { client_id }
    }
}

impl Display for EhloCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct StarttlsCommand;

impl Display for StarttlsCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

/// AUTH PLAIN command with an inline initial response.
///
/// The blob is base64 over an empty authorization identity, a NUL, the
/// username, a NUL and the password.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AuthPlainCommand {
    credentials: Credentials,
}

impl AuthPlainCommand {
    pub fn new(credentials: Credentials) -> AuthPlainCommand {
        AuthPlainCommand { credentials }
    }

    fn blob(&self) -> String {
        base64::encode(format!(
            "\u{0}{}\u{0}{}",
            self.credentials.username(),
            self.credentials.password()
        ))
    }
}

impl Display for AuthPlainCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "AUTH PLAIN {}\r\n", self.blob())
    }
}

/// MAIL FROM command carrying the envelope sender.
///
/// The sender here is a raw string rather than a validated address: it is
/// the authentication username, and an empty one produces the null
/// reverse-path `<>`.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MailCommand {
    sender: String,
}

impl MailCommand {
    pub fn new<S: Into<String>>(sender: S) -> MailCommand {
        MailCommand {
            sender: sender.into(),
        }
    }
}

impl Display for MailCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "MAIL FROM:<{}>\r\n", self.sender)
    }
}

/// RCPT TO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct RcptCommand {
    recipient: EmailAddress,
}

impl RcptCommand {
    pub fn new(recipient: EmailAddress) -> RcptCommand {
        RcptCommand { recipient }
    }
}

impl Display for RcptCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DataCommand;

impl Display for DataCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct QuitCommand;

impl Display for QuitCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}
