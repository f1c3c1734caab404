//! RFC 5322 rendering of outgoing messages.

use std::fmt::Write;

use base64::Engine;
use chrono::{DateTime, Utc};

use crate::address::Address;

/// Input bytes per RFC 2047 encoded word; keeps each word under 76 chars.
const ENCODED_WORD_CHUNK: usize = 45;

/// Characters per line of a base64 body (RFC 2045).
const BASE64_LINE: usize = 76;

/// How the body travels in the DATA payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// Plain ASCII.
    SevenBit,
    /// Raw UTF-8; needs 8BITMIME.
    EightBit,
    /// UTF-8 wrapped in base64 for relays without 8BITMIME.
    Base64,
}

/// A plain-text message ready for submission.
#[derive(Debug, Clone)]
pub struct Message {
    /// Sender.
    pub from: Address,
    /// Recipients (all end up in the `To` header and the envelope).
    pub to: Vec<Address>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Value of the `Date` header.
    pub date: DateTime<Utc>,
}

impl Message {
    /// Creates a message dated now.
    #[must_use]
    pub fn new(
        from: Address,
        to: Vec<Address>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            subject: subject.into(),
            body: body.into(),
            date: Utc::now(),
        }
    }

    /// Returns true if any part of the message needs 8-bit transport.
    #[must_use]
    pub fn is_eight_bit(&self) -> bool {
        !self.body.is_ascii()
    }

    /// Picks the body encoding for a relay that does or does not offer
    /// 8BITMIME.
    #[must_use]
    pub fn body_encoding(&self, eight_bit_mime: bool) -> BodyEncoding {
        match (self.is_eight_bit(), eight_bit_mime) {
            (false, _) => BodyEncoding::SevenBit,
            (true, true) => BodyEncoding::EightBit,
            (true, false) => BodyEncoding::Base64,
        }
    }

    /// Renders headers and body with CRLF line endings, assuming the relay
    /// accepts 8-bit data.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_as(self.body_encoding(true))
    }

    /// Renders headers and body with the given body encoding.
    #[must_use]
    pub fn render_as(&self, encoding: BodyEncoding) -> String {
        let mut out = String::new();

        let _ = write!(out, "From: {}\r\n", self.from);
        let to: Vec<&str> = self.to.iter().map(Address::as_str).collect();
        let _ = write!(out, "To: {}\r\n", to.join(", "));
        let _ = write!(out, "Subject: {}\r\n", encode_header(&self.subject));
        let _ = write!(out, "Date: {}\r\n", self.date.to_rfc2822());
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        let cte = match encoding {
            BodyEncoding::SevenBit => "7bit",
            BodyEncoding::EightBit => "8bit",
            BodyEncoding::Base64 => "base64",
        };
        let _ = write!(out, "Content-Transfer-Encoding: {cte}\r\n");
        out.push_str("\r\n");

        let body = self.crlf_body();
        if encoding == BodyEncoding::Base64 {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&body);
            let mut rest = encoded.as_str();
            while !rest.is_empty() {
                let (line, tail) = rest.split_at(rest.len().min(BASE64_LINE));
                out.push_str(line);
                out.push_str("\r\n");
                rest = tail;
            }
        } else {
            out.push_str(&body);
        }

        out
    }

    fn crlf_body(&self) -> String {
        let mut body = self.body.lines().collect::<Vec<_>>().join("\r\n");
        body.push_str("\r\n");
        body
    }
}

/// Encodes a header value as RFC 2047 words when it is not plain ASCII.
///
/// CR and LF become spaces so a value always stays one header.
#[must_use]
pub fn encode_header(value: &str) -> String {
    let value = value.replace(['\r', '\n'], " ");
    if value.is_ascii() {
        return value;
    }

    let engine = base64::engine::general_purpose::STANDARD;
    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(format!("=?UTF-8?B?{}?=", engine.encode(&chunk)));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?UTF-8?B?{}?=", engine.encode(&chunk)));
    }
    words.join("\r\n ")
}
