//! # broadsheet-smtp
//!
//! A small SMTP submission client (RFC 5321) used to deliver newsletter mail.
//!
//! ## Features
//!
//! - Implicit TLS (port 465) and STARTTLS (port 587) via rustls
//! - AUTH PLAIN
//! - 8BITMIME when the relay offers it, RFC 2047 encoded subjects
//! - Server rejections surface with their reply code
//!
//! ## Quick Start
//!
//! ```ignore
//! use broadsheet_smtp::{Address, ConnectOptions, Message, submit};
//!
//! let options = ConnectOptions::new("smtp.example.com");
//! let message = Message::new(
//!     Address::new("news@example.com")?,
//!     vec![Address::new("reader@example.org")?],
//!     "Weekly digest",
//!     "Hello!",
//! );
//! submit(&options, &message).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod command;
mod error;
mod message;
pub mod reply;
mod session;
mod stream;

pub use address::Address;
pub use command::Command;
pub use error::{Error, Result};
pub use message::{BodyEncoding, Message, encode_header};
pub use reply::Reply;
pub use session::{ConnectOptions, Credentials, Security, Session, dot_stuff};

/// Opens a session, submits one message and closes the session.
///
/// A failed QUIT after an accepted message is logged and ignored.
///
/// # Errors
///
/// Returns an error if connecting, authenticating or the mail transaction
/// fails.
pub async fn submit(options: &ConnectOptions, message: &Message) -> Result<()> {
    let mut session = Session::open(options).await?;
    session.send(message).await?;
    if let Err(e) = session.quit().await {
        tracing::debug!("QUIT after delivery failed: {e}");
    }
    Ok(())
}
