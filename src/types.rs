use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Rejected address input.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid email address")]
pub struct AddressError;

/// Email address
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Accepts `address` after basic checks that keep control characters out
    /// of the SMTP protocol. Actual mailbox validation is the server's job.
    pub fn new(address: String) -> Result<EmailAddress, AddressError> {
        if address.chars().any(|c| {
            !c.is_ascii() || c.is_ascii_control() || c.is_ascii_whitespace() || c == '<' || c == '>'
        }) {
            return Err(AddressError);
        }

        Ok(EmailAddress(address))
    }
}

impl FromStr for EmailAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmailAddress::new(s.to_string())
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity announced in the EHLO command.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(name: String) -> ClientId {
        ClientId(name)
    }

    /// Client id taken from the local hostname, falling back to `localhost`.
    pub fn hostname() -> ClientId {
        ClientId(
            hostname::get()
                .ok()
                .and_then(|name| name.into_string().ok())
                .unwrap_or_else(|| "localhost".to_string()),
        )
    }
}

impl Default for ClientId {
    fn default() -> Self {
        ClientId("localhost".to_string())
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    #[test]
    fn test_email_address() {
        assert!(EmailAddress::new("foobar@example.org".to_string()).is_ok());
        assert!(EmailAddress::new("foobar@localhost".to_string()).is_ok());
        assert!(EmailAddress::new("foo\rbar@localhost".to_string()).is_err());
        assert!(EmailAddress::new("foo\nbar@localhost".to_string()).is_err());
        assert!(EmailAddress::new(">foobar@example.org".to_string()).is_err());
        assert!(EmailAddress::new("foo bar@example.org".to_string()).is_err());
        assert!(EmailAddress::new("foobar@exa\r\nmple.org".to_string()).is_err());
    }

    #[test]
    fn test_default_client_id() {
        assert_eq!(ClientId::default().to_string(), "localhost");
    }
}
