//! # broadsheet-core
//!
//! Domain logic for the `Broadsheet` mailing-list manager.
//!
//! This crate provides:
//! - Recipients, messages and newsletters with form validation
//! - Users and named permission grants
//! - Local storage (`SQLite`) behind per-entity repositories
//! - The newsletter send workflow and its attempt log
//! - Per-user statistics and dashboard counters
//! - A single access-control table consulted by every surface

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod attempts;
pub mod cache;
mod db;
mod error;
pub mod messages;
pub mod newsletters;
pub mod policy;
pub mod recipients;
pub mod service;
pub mod stats;
pub mod users;
pub mod validation;

pub use attempts::{Attempt, AttemptId, AttemptRepository};
pub use cache::RecipientCache;
pub use db::Database;
pub use error::{Error, Result};
pub use messages::{Message, MessageForm, MessageId, MessageRepository};
pub use newsletters::{Newsletter, NewsletterForm, NewsletterId, NewsletterRepository, Status};
pub use policy::{Denial, Entity, Operation, authorize, sees_all};
pub use recipients::{Recipient, RecipientForm, RecipientId, RecipientRepository};
pub use service::{
    Dispatcher, LogTransport, MailTransport, OutgoingMail, SendReport, SmtpTransport,
    TransportError,
};
pub use stats::{Dashboard, StatisticsRepository, UserStatistics};
pub use users::{AvatarUpload, NewUser, Permission, User, UserId, UserRepository};
pub use validation::{ValidationError, ValidationResult};
