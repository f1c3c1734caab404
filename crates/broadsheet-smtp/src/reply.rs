//! SMTP replies and their parsing.
//!
//! Replies are single-line (`250 OK`) or multi-line, where every line but the
//! last uses `-` after the code (`250-First`, `250 Last`).

use crate::error::{Error, Result};

/// A complete reply from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit reply code.
    pub code: u16,
    /// Text of each reply line, without the code and separator.
    pub lines: Vec<String>,
}

impl Reply {
    /// 220 Service ready.
    pub const SERVICE_READY: u16 = 220;
    /// 221 Service closing transmission channel.
    pub const CLOSING: u16 = 221;
    /// 235 Authentication succeeded.
    pub const AUTH_OK: u16 = 235;
    /// 354 Start mail input.
    pub const START_DATA: u16 = 354;

    /// Returns true for a positive completion reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// Returns the reply text with lines joined by a space.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }

    /// Converts a reply into an error unless its code is `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] carrying the reply code and text.
    pub fn expect_code(self, expected: u16) -> Result<Self> {
        if self.code == expected {
            Ok(self)
        } else {
            Err(Error::rejected(self.code, self.text()))
        }
    }

    /// Converts a reply into an error unless it is a 2xx reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] carrying the reply code and text.
    pub fn expect_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::rejected(self.code, self.text()))
        }
    }
}

/// Returns true if `line` terminates a (possibly multi-line) reply.
#[must_use]
pub fn is_last_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() == 3 || (bytes.len() >= 4 && bytes[3] == b' ')
}

/// Parses the collected lines of one reply.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if there are no lines, a line is shorter than
/// a reply code, the code is not numeric, or the lines disagree on the code.
pub fn parse(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("empty reply".into()))?;
    let code = parse_code(first)?;

    let mut text = Vec::with_capacity(lines.len());
    for line in lines {
        if parse_code(line)? != code {
            return Err(Error::Protocol(format!(
                "reply code changed mid-reply: {line}"
            )));
        }
        text.push(line.get(4..).unwrap_or_default().to_string());
    }

    Ok(Reply { code, lines: text })
}

fn parse_code(line: &str) -> Result<u16> {
    let digits = line
        .get(..3)
        .ok_or_else(|| Error::Protocol(format!("reply too short: {line}")))?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Protocol(format!("invalid reply code: {line}")));
    }
    digits
        .parse()
        .map_err(|_| Error::Protocol(format!("invalid reply code: {line}")))
}
