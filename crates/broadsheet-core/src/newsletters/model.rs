//! Newsletter model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::MessageId;
use crate::recipients::RecipientId;
use crate::users::UserId;

/// Unique identifier for a newsletter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewsletterId(pub i64);

impl std::fmt::Display for NewsletterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a newsletter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not sent yet.
    #[default]
    Created,
    /// A send is in progress.
    Started,
    /// The last send ran to the end.
    Completed,
}

impl Status {
    /// Stored label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }

    /// Parse a stored label. Unknown labels read as [`Status::Created`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "started" => Self::Started,
            "completed" => Self::Completed,
            _ => Self::Created,
        }
    }

    /// Get display name for the status.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Started => "Started",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message bound to a recipient set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Newsletter {
    /// Database ID.
    pub id: NewsletterId,
    /// Stamped at creation.
    pub sent_date: DateTime<Utc>,
    /// Stamped at creation; not moved by sending.
    pub end_of_sending: DateTime<Utc>,
    /// Lifecycle state.
    pub status: Status,
    /// The one message this newsletter sends.
    pub message_id: MessageId,
    /// Recipients, in listing order.
    pub recipient_ids: Vec<RecipientId>,
    /// Creating user; cleared if that user is deleted.
    pub owner_id: Option<UserId>,
    /// Blocked newsletters cannot be sent.
    pub is_blocked: bool,
    /// Every recipient succeeded on the last send.
    pub success: bool,
}

/// Create/update form for a newsletter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsletterForm {
    /// Message to send.
    pub message_id: MessageId,
    /// Recipients to send it to.
    #[serde(default)]
    pub recipient_ids: Vec<RecipientId>,
}
