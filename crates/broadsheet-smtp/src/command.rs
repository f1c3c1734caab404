//! SMTP commands issued during submission.

use crate::address::Address;

/// A command sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO with the client's name.
    Ehlo(String),
    /// STARTTLS upgrade request.
    StartTls,
    /// AUTH PLAIN with a base64 initial response.
    AuthPlain(String),
    /// MAIL FROM, optionally declaring an 8-bit body.
    MailFrom {
        /// Reverse path.
        from: Address,
        /// Adds `BODY=8BITMIME` when the server supports it.
        eight_bit: bool,
    },
    /// RCPT TO.
    RcptTo(Address),
    /// DATA.
    Data,
    /// QUIT.
    Quit,
}

impl Command {
    /// Serializes the command, including the trailing CRLF.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo(name) => format!("EHLO {name}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::AuthPlain(initial) => format!("AUTH PLAIN {initial}"),
            Self::MailFrom { from, eight_bit } => {
                if *eight_bit {
                    format!("MAIL FROM:<{from}> BODY=8BITMIME")
                } else {
                    format!("MAIL FROM:<{from}>")
                }
            }
            Self::RcptTo(to) => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        };
        let mut bytes = line.into_bytes();
        bytes.extend_from_slice(b"\r\n");
        bytes
    }

    /// Name used in log output; never includes credentials.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo(_) => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::AuthPlain(_) => "AUTH",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo(_) => "RCPT",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }
}
