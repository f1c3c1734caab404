//! Message model and content policy.

use serde::{Deserialize, Serialize};

use crate::users::UserId;
use crate::validation::{ValidationError, ValidationResult, char_len, finish, is_denied};

const MAX_SUBJECT_LEN: usize = 250;

/// Unique identifier for a message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reusable subject and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Database ID.
    pub id: MessageId,
    /// Subject line, possibly empty.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Creating user; cleared if that user is deleted.
    pub owner_id: Option<UserId>,
}

/// Create/update form for a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageForm {
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Validate a message form.
///
/// Both fields are trimmed first. The content policy only fires when the
/// subject is non-empty and the whole body, lower-cased, is a denylisted
/// word. Both fields are flagged.
///
/// # Errors
///
/// Returns every validation error found.
pub fn validate_message(form: &MessageForm) -> ValidationResult {
    let mut errors = Vec::new();

    let subject = form.subject.trim();
    let body = form.body.trim();

    if char_len(subject) > MAX_SUBJECT_LEN {
        errors.push(ValidationError::SubjectTooLong);
    }
    if subject.contains(['\r', '\n']) {
        errors.push(ValidationError::SubjectLineBreak);
    }

    if body.is_empty() {
        errors.push(ValidationError::EmptyBody);
    }

    if !subject.is_empty() && is_denied(body) {
        errors.push(ValidationError::ForbiddenSubject);
        errors.push(ValidationError::ForbiddenBody);
    }

    finish(errors)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(subject: &str, body: &str) -> MessageForm {
        MessageForm {
            subject: subject.into(),
            body: body.into(),
        }
    }

    #[test]
    fn test_denied_body_with_subject_flags_both_fields() {
        let errors = validate_message(&form("бесплатно", "казино")).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ForbiddenSubject, ValidationError::ForbiddenBody]
        );
        assert!(errors.iter().all(|e| e.message() == "forbidden word"));
    }

    #[test]
    fn test_empty_subject_short_circuits_policy() {
        assert!(validate_message(&form("", "казино")).is_ok());
    }

    #[test]
    fn test_policy_ignores_denied_subject_alone() {
        assert!(validate_message(&form("казино", "Hello there")).is_ok());
    }

    #[test]
    fn test_policy_is_case_insensitive() {
        assert!(validate_message(&form("News", "БИРЖА")).is_err());
    }

    #[test]
    fn test_policy_matches_whole_body_only() {
        assert!(validate_message(&form("News", "лучшее казино")).is_ok());
    }

    #[test]
    fn test_policy_sees_trimmed_fields() {
        let errors = validate_message(&form("News", " казино \n")).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ForbiddenSubject, ValidationError::ForbiddenBody]
        );
        assert!(validate_message(&form("   ", "казино")).is_ok());
    }

    #[test]
    fn test_subject_line_break_rejected() {
        let errors = validate_message(&form("Hi\r\nBcc: victim@example.net", "Hello")).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SubjectLineBreak]);
        assert_eq!(errors[0].field(), "subject");
    }

    #[test]
    fn test_length_and_required_body() {
        let errors = validate_message(&form(&"s".repeat(251), " ")).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::SubjectTooLong, ValidationError::EmptyBody]
        );
    }
}
