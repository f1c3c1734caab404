//! Services that sit above the repositories.
//!
//! The send workflow lives here together with the transports it drives.

pub mod send;
pub mod transport;

pub use send::{Dispatcher, SendReport};
pub use transport::{LogTransport, MailTransport, OutgoingMail, SmtpTransport, TransportError};
