//! The newsletter send workflow.
//!
//! One call makes one pass over the newsletter's recipients, one transport
//! call each, in listing order. Failures are written to the report and the
//! pass carries on. Exactly one attempt is recorded per call.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::transport::{MailTransport, OutgoingMail};
use crate::attempts::{AttemptId, AttemptRepository};
use crate::db::Database;
use crate::messages::MessageRepository;
use crate::newsletters::{NewsletterId, NewsletterRepository, Status};
use crate::recipients::RecipientId;
use crate::users::User;
use crate::{Error, Result};

/// Outcome of one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReport {
    /// Attempt recorded for this send.
    pub attempt_id: AttemptId,
    /// Newsletter that was sent.
    pub newsletter_id: NewsletterId,
    /// Newsletter status after the send.
    pub status: Status,
    /// Recipients the transport accepted.
    pub delivered: Vec<RecipientId>,
    /// Number of recipients the transport refused.
    pub failed: usize,
    /// One line per recipient.
    pub lines: Vec<String>,
}

impl SendReport {
    /// True if every recipient was delivered to.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failed == 0
    }

    /// The per-recipient report as stored on the attempt.
    #[must_use]
    pub fn server_response(&self) -> String {
        self.lines.join("\n")
    }

    /// Plain-text summary returned to whoever started the send.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Newsletter sent! Succeeded: {}, Failed: {}\nReports:\n{}",
            self.delivered.len(),
            self.failed,
            self.server_response()
        )
    }
}

/// Runs the send workflow against a transport.
#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    newsletters: NewsletterRepository,
    messages: MessageRepository,
    attempts: AttemptRepository,
    transport: Arc<dyn MailTransport>,
    from: String,
}

impl Dispatcher {
    /// Dispatcher sending as `from` through `transport`.
    #[must_use]
    pub fn new(db: &Database, transport: Arc<dyn MailTransport>, from: impl Into<String>) -> Self {
        Self {
            db: db.clone(),
            newsletters: NewsletterRepository::new(db),
            messages: MessageRepository::new(db),
            attempts: AttemptRepository::new(db),
            transport,
            from: from.into(),
        }
    }

    /// Sender address used for every mail.
    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// Send newsletter `id` on behalf of `actor`.
    ///
    /// The attempt is opened and the newsletter moved to `started` before
    /// the first delivery. The final status, success flag, attempt response
    /// and delivered set are written in one transaction after the last.
    ///
    /// Permission checks are the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the newsletter does not exist,
    /// [`Error::NewsletterBlocked`] if it is blocked (no attempt is
    /// recorded), or an error if a database query fails. Transport failures
    /// are not errors.
    pub async fn send(&self, id: NewsletterId, actor: &User) -> Result<SendReport> {
        let newsletter = self.newsletters.require(id).await?;
        if newsletter.is_blocked {
            warn!(newsletter_id = %id, user_id = %actor.id, "Refusing to send blocked newsletter");
            return Err(Error::NewsletterBlocked(id.0));
        }

        let message = self.messages.require(newsletter.message_id).await?;
        let recipients = self.newsletters.recipients_of(id).await?;

        let attempt_id = self.attempts.open(id, actor.id, newsletter.status).await?;
        self.newsletters.set_status(id, Status::Started).await?;
        info!(
            newsletter_id = %id,
            attempt_id = %attempt_id,
            recipients = recipients.len(),
            "Sending newsletter"
        );

        let mut delivered = Vec::with_capacity(recipients.len());
        let mut lines = Vec::with_capacity(recipients.len());
        let mut failed = 0;

        for recipient in &recipients {
            let mail = OutgoingMail::new(&self.from, &message.subject, &message.body)
                .to(&recipient.email);

            match self.transport.send(&mail).await {
                Ok(()) => {
                    delivered.push(recipient.id);
                    lines.push(format!("Success: {}", recipient.email));
                }
                Err(e) => {
                    warn!(newsletter_id = %id, "Delivery to {} failed: {e}", recipient.email);
                    failed += 1;
                    lines.push(format!("Failure: {} - {e}", recipient.email));
                }
            }
        }

        let report = SendReport {
            attempt_id,
            newsletter_id: id,
            status: Status::Completed,
            delivered,
            failed,
            lines,
        };

        let mut tx = self.db.pool().begin().await?;
        NewsletterRepository::complete_send(&mut tx, id, report.status, report.success())
            .await?;
        AttemptRepository::record_outcome(
            &mut tx,
            attempt_id,
            report.status,
            &report.server_response(),
            &report.delivered,
        )
        .await?;
        tx.commit().await?;

        info!(
            newsletter_id = %id,
            attempt_id = %attempt_id,
            succeeded = report.delivered.len(),
            failed = report.failed,
            "Newsletter send finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}
