//! Recipient model and form validation.

use serde::{Deserialize, Serialize};

use crate::users::UserId;
use crate::validation::{
    ValidationError, ValidationResult, char_len, finish, is_valid_email,
};

const MAX_FULL_NAME_LEN: usize = 150;

/// Unique identifier for a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An address newsletters can be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// Database ID.
    pub id: RecipientId,
    /// Unique, lower-cased email address.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Free-text note.
    pub comment: String,
    /// Creating user; cleared if that user is deleted.
    pub owner_id: Option<UserId>,
}

/// Create/update form for a recipient.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipientForm {
    /// Email address.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Free-text note.
    #[serde(default)]
    pub comment: String,
}

impl RecipientForm {
    /// Email address as stored.
    #[must_use]
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// Validate a recipient form.
///
/// # Errors
///
/// Returns every validation error found.
pub fn validate_recipient(form: &RecipientForm) -> ValidationResult {
    let mut errors = Vec::new();

    let email = form.email.trim();
    if email.is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(email) {
        errors.push(ValidationError::InvalidEmail);
    }

    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        errors.push(ValidationError::EmptyFullName);
    } else if char_len(full_name) > MAX_FULL_NAME_LEN {
        errors.push(ValidationError::FullNameTooLong);
    }

    if form.comment.trim().is_empty() {
        errors.push(ValidationError::EmptyComment);
    }

    finish(errors)
}
