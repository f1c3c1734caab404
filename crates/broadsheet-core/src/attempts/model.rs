//! Attempt model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::newsletters::{NewsletterId, Status};
use crate::recipients::RecipientId;
use crate::users::UserId;

/// Unique identifier for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub i64);

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one send run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    /// Database ID.
    pub id: AttemptId,
    /// When the run began.
    pub attempted_at: DateTime<Utc>,
    /// Newsletter status after the run.
    pub status: Status,
    /// Per-recipient report, one line each.
    pub server_response: String,
    /// Newsletter that was sent.
    pub newsletter_id: NewsletterId,
    /// Recipients that were delivered to.
    pub recipient_ids: Vec<RecipientId>,
    /// User who ran the send.
    pub owner_id: UserId,
}
