//! The transaction engine: connection parameters plus the single `send`
//! operation.

use std::time::Duration;

use log::debug;

use crate::authentication::Credentials;
use crate::commands::{
    AuthPlainCommand, DataCommand, EhloCommand, MailCommand, QuitCommand, RcptCommand,
    StarttlsCommand,
};
use crate::error::Error;
use crate::message;
use crate::net::{NetworkStream, TlsParameters};
use crate::stream::SmtpStream;
use crate::types::{ClientId, EmailAddress};

/// Default ceiling on every connect, read and write of a transaction.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

macro_rules! step (
    ($result: expr, $stream: ident, $tag: expr) => ({
        match $result {
            Ok(val) => val,
            Err(reason) => return (Some($stream), Err($tag(reason))),
        }
    })
);

/// Connection parameters for one transaction attempt.
///
/// The sender name and address only shape the `From:` header. The envelope
/// sender negotiated in MAIL FROM is always the authentication username,
/// empty when unauthenticated, which yields the null reverse-path `<>`.
/// Keeping those two identities apart is the point of this engine.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SmtpClient {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    sender_email: String,
    sender_name: String,
    hello_name: ClientId,
    accept_invalid_certs: bool,
    timeout: Duration,
}

impl SmtpClient {
    /// Creates a new client for `host:port`.
    ///
    /// Defaults are no authentication, strict certificate verification, an
    /// EHLO name of `localhost` and a 30 second timeout. Nothing connects
    /// until [`send`](SmtpClient::send) is called.
    pub fn new<H: Into<String>>(host: H, port: u16) -> SmtpClient {
        SmtpClient {
            host: host.into(),
            port,
            credentials: None,
            sender_email: String::new(),
            sender_name: String::new(),
            hello_name: ClientId::default(),
            accept_invalid_certs: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the credentials for AUTH PLAIN; the username doubles as the
    /// envelope sender.
    pub fn credentials<C: Into<Credentials>>(mut self, credentials: C) -> SmtpClient {
        self.credentials = Some(credentials.into());
        self
    }

    /// Set the display name and address composed into the `From:` header.
    pub fn sender<N: Into<String>, A: Into<String>>(mut self, name: N, address: A) -> SmtpClient {
        self.sender_name = name.into();
        self.sender_email = address.into();
        self
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> SmtpClient {
        self.hello_name = name;
        self
    }

    /// Skip certificate chain and hostname verification during the STARTTLS
    /// handshake. For lab servers with self-signed certificates only.
    pub fn accept_invalid_certs(mut self, accept: bool) -> SmtpClient {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set the per-operation network timeout.
    pub fn timeout(mut self, timeout: Duration) -> SmtpClient {
        self.timeout = timeout;
        self
    }

    /// Runs one complete mail transaction: connect, greeting, EHLO,
    /// opportunistic STARTTLS, optional AUTH PLAIN, envelope, DATA, QUIT.
    ///
    /// Opens exactly one connection and releases it on every exit path. The
    /// first failing mandatory step aborts the transaction and comes back as
    /// the step-tagged [`Error`]; nothing is retried.
    ///
    /// `recipient` is validated by construction; `subject` and `body` must
    /// already be free of raw CR/LF (the caller's responsibility).
    pub async fn send(
        &self,
        recipient: &EmailAddress,
        subject: &str,
        body: &str,
    ) -> Result<(), Error> {
        debug!("connecting to {}:{}", self.host, self.port);
        let socket = NetworkStream::connect(&self.host, self.port, self.timeout)
            .await
            .map_err(|e| Error::Connect(e.into()))?;
        let stream = SmtpStream::new(socket, self.timeout);

        let (stream, result) = self.transact(stream, recipient, subject, body).await;
        // Released on every exit path.
        if let Some(mut stream) = stream {
            stream.close().await;
        }
        result
    }

    async fn transact(
        &self,
        mut stream: SmtpStream<NetworkStream>,
        recipient: &EmailAddress,
        subject: &str,
        body: &str,
    ) -> (Option<SmtpStream<NetworkStream>>, Result<(), Error>) {
        step!(
            stream.read_response().await.and_then(|r| r.require(220)),
            stream,
            Error::Greeting
        );
        step!(
            stream
                .exchange(EhloCommand::new(self.hello_name.clone()), 250)
                .await,
            stream,
            Error::Ehlo
        );

        // Best-effort upgrade: refusals and send failures downgrade the
        // transaction to plaintext, mirroring permissive MTA behavior.
        match stream.command(StarttlsCommand).await {
            Ok(reply) if reply.has_code(220) => {
                let parameters = self.tls_parameters();
                stream = match stream.upgrade_tls(&parameters).await {
                    Ok(upgraded) => upgraded,
                    // The handshake ate the socket; nothing left to close.
                    Err(reason) => return (None, Err(Error::TlsHandshake(reason))),
                };
                step!(
                    stream
                        .exchange(EhloCommand::new(self.hello_name.clone()), 250)
                        .await,
                    stream,
                    Error::PostTlsEhlo
                );
            }
            Ok(reply) => debug!("STARTTLS refused ({}), continuing in plaintext", reply),
            Err(reason) => debug!("STARTTLS failed ({}), continuing in plaintext", reason),
        }

        if let Some(credentials) = self.auth_credentials() {
            step!(
                stream
                    .exchange(AuthPlainCommand::new(credentials.clone()), 235)
                    .await,
                stream,
                Error::Auth
            );
        }

        step!(
            stream
                .exchange(MailCommand::new(self.envelope_sender()), 250)
                .await,
            stream,
            Error::MailFrom
        );
        step!(
            stream
                .exchange(RcptCommand::new(recipient.clone()), 250)
                .await,
            stream,
            Error::RcptTo
        );
        step!(stream.exchange(DataCommand, 354).await, stream, Error::Data);

        let message = message::compose(
            &self.sender_name,
            &self.sender_email,
            recipient,
            subject,
            body,
        );
        step!(
            stream.send_message(message.as_bytes()).await,
            stream,
            Error::BodyWrite
        );
        step!(
            stream.read_response().await.and_then(|r| r.require(250)),
            stream,
            Error::DataConfirm
        );

        // The message is accepted at this point; a failed QUIT cannot
        // unaccept it.
        if let Err(reason) = stream.command(QuitCommand).await {
            debug!("QUIT failed: {}", reason);
        }

        (Some(stream), Ok(()))
    }

    /// Credentials usable for AUTH PLAIN: both parts must be non-empty.
    fn auth_credentials(&self) -> Option<&Credentials> {
        self.credentials
            .as_ref()
            .filter(|c| !c.username().is_empty() && !c.password().is_empty())
    }

    /// The envelope sender is the authentication username, never the header
    /// From value.
    fn envelope_sender(&self) -> &str {
        self.credentials
            .as_ref()
            .map(Credentials::username)
            .unwrap_or_default()
    }

    fn tls_parameters(&self) -> TlsParameters {
        if self.accept_invalid_certs {
            TlsParameters::insecure(self.host.clone())
        } else {
            TlsParameters::new(self.host.clone())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    use crate::mock::MockStream;

    fn client() -> SmtpClient {
        SmtpClient::new("127.0.0.1", 2525).sender("Carla CEO", "ceo@corp.example")
    }

    async fn run(client: &SmtpClient, script: &str) -> (String, Result<(), Error>) {
        let stream = SmtpStream::new(
            NetworkStream::Mock(MockStream::with_script(script.as_bytes())),
            DEFAULT_TIMEOUT,
        );
        let recipient: EmailAddress = "bob@example.com".parse().unwrap();
        let (stream, result) = client.transact(stream, &recipient, "Hi", "hello").await;
        let written = match stream.map(SmtpStream::into_inner) {
            Some(NetworkStream::Mock(mock)) => String::from_utf8(mock.written().to_vec()).unwrap(),
            _ => String::new(),
        };
        (written, result)
    }

    #[tokio::test]
    async fn full_transaction_in_plaintext() {
        let client = client().credentials(("courier@relay.example", "hunter2"));
        let script = "220 mock ready\r\n\
                      250-mock\r\n250 AUTH PLAIN\r\n\
                      502 no tls here\r\n\
                      235 ok\r\n\
                      250 sender ok\r\n\
                      250 recipient ok\r\n\
                      354 go ahead\r\n\
                      250 queued\r\n\
                      221 bye\r\n";
        let (wire, result) = run(&client, script).await;
        result.unwrap();

        assert!(wire.starts_with("EHLO localhost\r\n"));
        assert_eq!(wire.matches("EHLO").count(), 1);
        assert!(wire.contains("STARTTLS\r\n"));
        assert!(wire.contains("AUTH PLAIN "));
        assert!(wire.contains("MAIL FROM:<courier@relay.example>\r\n"));
        assert!(wire.contains("RCPT TO:<bob@example.com>\r\n"));
        assert!(wire.contains("DATA\r\n"));
        assert!(wire.contains("From: Carla CEO <ceo@corp.example>\r\n"));
        assert!(wire.contains("Subject: Hi\r\n"));
        assert!(wire.contains("\r\n\r\nhello\r\n.\r\n"));
        assert!(wire.ends_with("QUIT\r\n"));
    }

    #[tokio::test]
    async fn accepted_starttls_repeats_ehlo_before_anything_else() {
        let client = client();
        let script = "220 mock ready\r\n\
                      250 mock\r\n\
                      220 go ahead\r\n\
                      250 mock again\r\n\
                      250 sender ok\r\n\
                      250 recipient ok\r\n\
                      354 go ahead\r\n\
                      250 queued\r\n\
                      221 bye\r\n";
        let (wire, result) = run(&client, script).await;
        result.unwrap();

        // Mock streams pass through the upgrade untouched, so the whole
        // exchange stays observable.
        assert_eq!(wire.matches("EHLO localhost\r\n").count(), 2);
        let after_starttls = wire.split("STARTTLS\r\n").nth(1).unwrap();
        assert!(after_starttls.starts_with("EHLO localhost\r\n"));
    }

    #[tokio::test]
    async fn rejected_greeting_stops_the_transaction() {
        let (wire, result) = run(&client(), "554 go away\r\n").await;
        match result {
            Err(Error::Greeting(_)) => {}
            other => panic!("expected greeting error, got {:?}", other),
        }
        assert!(wire.is_empty());
    }

    #[tokio::test]
    async fn auth_skipped_without_a_full_credential_pair() {
        let client = client().credentials(("courier@relay.example", ""));
        let script = "220 mock ready\r\n\
                      250 mock\r\n\
                      502 no tls here\r\n\
                      250 sender ok\r\n\
                      250 recipient ok\r\n\
                      354 go ahead\r\n\
                      250 queued\r\n\
                      221 bye\r\n";
        let (wire, result) = run(&client, script).await;
        result.unwrap();

        assert!(!wire.contains("AUTH"));
        // The username still drives the envelope sender.
        assert!(wire.contains("MAIL FROM:<courier@relay.example>\r\n"));
    }

    #[tokio::test]
    async fn unauthenticated_send_uses_the_null_reverse_path() {
        let script = "220 mock ready\r\n\
                      250 mock\r\n\
                      502 no tls here\r\n\
                      250 sender ok\r\n\
                      250 recipient ok\r\n\
                      354 go ahead\r\n\
                      250 queued\r\n\
                      221 bye\r\n";
        let (wire, result) = run(&client(), script).await;
        result.unwrap();

        assert!(wire.contains("MAIL FROM:<>\r\n"));
    }

    #[tokio::test]
    async fn rejected_recipient_carries_the_reply_and_stops_before_data() {
        let script = "220 mock ready\r\n\
                      250 mock\r\n\
                      502 no tls here\r\n\
                      250 sender ok\r\n\
                      550 no such user\r\n";
        let (wire, result) = run(&client(), script).await;
        let err = result.unwrap_err();
        match &err {
            Error::RcptTo(_) => {}
            other => panic!("expected RCPT TO error, got {:?}", other),
        }
        assert_eq!(err.reply().map(|r| r.code), Some(550));
        assert!(!wire.contains("DATA"));
    }
}
