//! A single submission session: greeting, EHLO, optional STARTTLS and AUTH,
//! then any number of message transactions.

use base64::Engine;
use tracing::{debug, trace};

use crate::address::Address;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::message::{BodyEncoding, Message};
use crate::reply::{self, Reply};
use crate::stream::Stream;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Implicit TLS from the first byte (port 465).
    Tls,
    /// Plain connect, then upgrade with STARTTLS (port 587).
    #[default]
    StartTls,
    /// No encryption. Only for local relays.
    None,
}

impl Security {
    /// Parses `tls`, `starttls` or `none` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tls" | "ssl" => Some(Self::Tls),
            "starttls" => Some(Self::StartTls),
            "none" | "plain" => Some(Self::None),
            _ => None,
        }
    }
}

/// Username and password for AUTH PLAIN.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Secret.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Relay hostname.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Optional credentials.
    pub credentials: Option<Credentials>,
    /// Name announced in EHLO.
    pub client_name: String,
}

impl ConnectOptions {
    /// Options for `host` with the usual submission port and STARTTLS.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            security: Security::StartTls,
            credentials: None,
            client_name: "localhost".to_string(),
        }
    }
}

/// An open, greeted (and possibly authenticated) SMTP session.
#[derive(Debug)]
pub struct Session {
    stream: Stream,
    extensions: Vec<String>,
}

impl Session {
    /// Connects, greets, upgrades and authenticates according to `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, the server rejects a step,
    /// or a required extension (STARTTLS, AUTH) is not advertised.
    pub async fn open(options: &ConnectOptions) -> Result<Self> {
        debug!(host = %options.host, port = options.port, security = ?options.security, "connecting");
        let stream = match options.security {
            Security::Tls => Stream::connect_tls(&options.host, options.port).await?,
            Security::StartTls | Security::None => {
                Stream::connect(&options.host, options.port).await?
            }
        };

        let mut session = Self::greet(stream, &options.client_name).await?;

        if options.security == Security::StartTls {
            session = session.starttls(&options.host, &options.client_name).await?;
        }

        if let Some(credentials) = &options.credentials {
            session.authenticate(credentials).await?;
        }

        Ok(session)
    }

    /// Reads the greeting and sends EHLO.
    pub(crate) async fn greet(mut stream: Stream, client_name: &str) -> Result<Self> {
        read_reply(&mut stream)
            .await?
            .expect_code(Reply::SERVICE_READY)?;

        let mut session = Self {
            stream,
            extensions: Vec::new(),
        };
        session.ehlo(client_name).await?;
        Ok(session)
    }

    async fn ehlo(&mut self, client_name: &str) -> Result<()> {
        let reply = self
            .command(&Command::Ehlo(client_name.to_string()))
            .await?
            .expect_success()?;
        self.extensions = reply.lines.into_iter().skip(1).collect();
        Ok(())
    }

    async fn starttls(mut self, host: &str, client_name: &str) -> Result<Self> {
        if !self.supports("STARTTLS") {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        self.command(&Command::StartTls)
            .await?
            .expect_code(Reply::SERVICE_READY)?;

        let stream = self.stream.upgrade(host).await?;
        let mut session = Self {
            stream,
            extensions: Vec::new(),
        };
        session.ehlo(client_name).await?;
        Ok(session)
    }

    /// Authenticates with AUTH PLAIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server does not offer AUTH, or
    /// [`Error::Rejected`] if the credentials are refused.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        if !self.supports("AUTH") {
            return Err(Error::NotSupported("AUTH".into()));
        }
        let token = format!("\0{}\0{}", credentials.username, credentials.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(token.as_bytes());
        self.command(&Command::AuthPlain(encoded))
            .await?
            .expect_code(Reply::AUTH_OK)?;
        Ok(())
    }

    /// Returns true if the server listed `keyword` in its EHLO reply.
    #[must_use]
    pub fn supports(&self, keyword: &str) -> bool {
        self.extensions.iter().any(|ext| {
            ext.split_whitespace()
                .next()
                .is_some_and(|word| word.eq_ignore_ascii_case(keyword))
        })
    }

    /// Runs one MAIL/RCPT/DATA transaction for `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message has no recipients or the server
    /// rejects any step of the transaction.
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        if message.to.is_empty() {
            return Err(Error::InvalidAddress("no recipients specified".into()));
        }

        let encoding = message.body_encoding(self.supports("8BITMIME"));
        if encoding == BodyEncoding::Base64 {
            debug!("Relay lacks 8BITMIME, sending body as base64");
        }
        self.command(&Command::MailFrom {
            from: message.from.clone(),
            eight_bit: encoding == BodyEncoding::EightBit,
        })
        .await?
        .expect_success()?;

        for to in &message.to {
            self.rcpt(to).await?;
        }

        self.command(&Command::Data)
            .await?
            .expect_code(Reply::START_DATA)?;

        self.stream
            .write_all(&dot_stuff(&message.render_as(encoding)))
            .await?;
        read_reply(&mut self.stream).await?.expect_success()?;
        Ok(())
    }

    async fn rcpt(&mut self, to: &Address) -> Result<()> {
        self.command(&Command::RcptTo(to.clone()))
            .await?
            .expect_success()?;
        Ok(())
    }

    /// Sends QUIT and closes the session.
    ///
    /// # Errors
    ///
    /// Returns an error if QUIT cannot be written or is not acknowledged.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.command(&Command::Quit).await?;
        if reply.is_success() || reply.code == Reply::CLOSING {
            Ok(())
        } else {
            Err(Error::rejected(reply.code, reply.text()))
        }
    }

    async fn command(&mut self, command: &Command) -> Result<Reply> {
        trace!(verb = command.verb(), "sending command");
        self.stream.write_all(&command.to_bytes()).await?;
        read_reply(&mut self.stream).await
    }
}

async fn read_reply(stream: &mut Stream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }
        let last = reply::is_last_line(&line);
        lines.push(line);
        if last {
            break;
        }
    }
    reply::parse(&lines)
}

/// Applies SMTP transparency (leading-dot doubling) and appends the
/// end-of-data marker.
#[must_use]
pub fn dot_stuff(rendered: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(rendered.len() + 5);
    for line in rendered.split_terminator("\r\n") {
        if line.starts_with('.') {
            out.push(b'.');
        }
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}
