//! Mail transports used by the send workflow.

use async_trait::async_trait;
use broadsheet_smtp::{Address, ConnectOptions, Message, submit};
use tracing::info;

/// Errors a transport reports for a single message.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sender or recipient address is malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The SMTP exchange failed.
    #[error("{0}")]
    Smtp(#[from] broadsheet_smtp::Error),

    /// Any other delivery failure.
    #[error("{0}")]
    Other(String),
}

/// One message handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
}

impl OutgoingMail {
    /// Creates a mail with no recipients yet.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            from: from.into(),
            to: Vec::new(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }
}

/// Something that can deliver mail.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `mail`, or say why not.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError>;
}

/// Delivers through an SMTP relay, one session per message.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    options: ConnectOptions,
}

impl SmtpTransport {
    /// Transport for the relay described by `options`.
    #[must_use]
    pub const fn new(options: ConnectOptions) -> Self {
        Self { options }
    }

    fn build(mail: &OutgoingMail) -> Result<Message, TransportError> {
        if mail.to.is_empty() {
            return Err(TransportError::InvalidAddress(
                "No recipients specified".into(),
            ));
        }

        let from = Address::new(&mail.from)
            .map_err(|_| TransportError::InvalidAddress(mail.from.clone()))?;
        let to = mail
            .to
            .iter()
            .map(|addr| {
                Address::new(addr).map_err(|_| TransportError::InvalidAddress(addr.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Message::new(from, to, &mail.subject, &mail.body))
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        let message = Self::build(mail)?;
        submit(&self.options, &message).await?;
        Ok(())
    }
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        info!(
            from = %mail.from,
            to = %mail.to.join(", "),
            subject = %mail.subject,
            "Mail not delivered (log transport), {} bytes of body",
            mail.body.len()
        );
        Ok(())
    }
}
