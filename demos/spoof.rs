use std::env;
use std::io::Read;

use structopt::StructOpt;

use spoofmail::{EmailAddress, SmtpClient};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// Send one message with a freely chosen From header.
///
/// Server, credentials and sender identity come from the environment:
/// SMTP_HOST, SMTP_PORT, SMTP_USER, SMTP_PASS, SMTP_SENDER_EMAIL,
/// SMTP_SENDER_NAME and INSECURE_SKIP_VERIFY.
#[derive(StructOpt, Debug)]
#[structopt(name = "spoof")]
struct Opt {
    /// Recipient address
    #[structopt(short = "t", name = "recipient address")]
    to: EmailAddress,

    /// Subject line
    #[structopt(short = "s", name = "subject", default_value = "(no subject)")]
    subject: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = match env::var("SMTP_PORT") {
        Ok(port) => port.parse()?,
        Err(_) => 25,
    };

    let mut client = SmtpClient::new(host, port)
        .sender(
            env::var("SMTP_SENDER_NAME").unwrap_or_default(),
            env::var("SMTP_SENDER_EMAIL").unwrap_or_default(),
        )
        .accept_invalid_certs(env::var("INSECURE_SKIP_VERIFY").as_deref() == Ok("true"));
    if let (Ok(user), Ok(pass)) = (env::var("SMTP_USER"), env::var("SMTP_PASS")) {
        client = client.credentials((user, pass));
    }

    println!("Type your mail and finish with Ctrl+D:");
    let mut body = String::new();
    std::io::stdin().read_to_string(&mut body)?;
    let body = body.replace('\n', "\r\n");

    match client.send(&opt.to, &opt.subject, &body).await {
        Ok(()) => println!("Email sent."),
        Err(e) => println!("Could not send email: {:?}", e),
    }

    Ok(())
}
