//! Field-level validation shared by every form.

/// Words that may not be used as message bodies or user names.
pub const DENYLIST: [&str; 9] = [
    "казино",
    "криптовалюта",
    "крипта",
    "биржа",
    "дешево",
    "бесплатно",
    "обман",
    "полиция",
    "радар",
];

/// Validation error for submitted form data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// Another record already uses this email address.
    DuplicateEmail,
    /// Full name is empty.
    EmptyFullName,
    /// Full name exceeds 150 characters.
    FullNameTooLong,
    /// Comment is empty.
    EmptyComment,
    /// Subject exceeds 250 characters.
    SubjectTooLong,
    /// Subject contains a line break.
    SubjectLineBreak,
    /// Subject rejected by the content policy.
    ForbiddenSubject,
    /// Body is empty.
    EmptyBody,
    /// Body rejected by the content policy.
    ForbiddenBody,
    /// Referenced message does not exist or is not visible.
    UnknownMessage,
    /// Referenced message already belongs to another newsletter.
    MessageInUse,
    /// No recipients were selected.
    EmptyRecipients,
    /// A referenced recipient does not exist or is not visible.
    UnknownRecipient,
    /// Username is empty.
    EmptyUsername,
    /// Username exceeds 50 characters.
    UsernameTooLong,
    /// Another user already has this username.
    DuplicateUsername,
    /// Username rejected by the content policy.
    ForbiddenUsername,
    /// First name rejected by the content policy.
    ForbiddenFirstName,
    /// Phone number contains something other than digits.
    PhoneNotDigits,
    /// Phone number exceeds 15 characters.
    PhoneTooLong,
    /// Avatar exceeds 5 MiB.
    AvatarTooLarge,
    /// Avatar is not a JPEG or PNG file.
    AvatarFormat,
    /// Avatar content could not be decoded.
    AvatarEncoding,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "Email address is required",
            Self::InvalidEmail => "Invalid email address format",
            Self::DuplicateEmail => "A record with this email address already exists",
            Self::EmptyFullName => "Full name is required",
            Self::FullNameTooLong => "Full name must be at most 150 characters",
            Self::EmptyComment => "Comment is required",
            Self::SubjectTooLong => "Subject must be at most 250 characters",
            Self::SubjectLineBreak => "Subject must be a single line",
            Self::ForbiddenSubject
            | Self::ForbiddenBody
            | Self::ForbiddenUsername
            | Self::ForbiddenFirstName => "forbidden word",
            Self::EmptyBody => "Message body is required",
            Self::UnknownMessage => "Message does not exist",
            Self::MessageInUse => "Message is already used by another newsletter",
            Self::EmptyRecipients => "At least one recipient is required",
            Self::UnknownRecipient => "Recipient does not exist",
            Self::EmptyUsername => "Username is required",
            Self::UsernameTooLong => "Username must be at most 50 characters",
            Self::DuplicateUsername => "A user with this username already exists",
            Self::PhoneNotDigits => "Phone number must contain digits only",
            Self::PhoneTooLong => "Phone number must be at most 15 characters",
            Self::AvatarTooLarge => "File size must not exceed 5MB",
            Self::AvatarFormat => "Unsupported file format. Allowed formats: *.jpg, *.jpeg, *.png",
            Self::AvatarEncoding => "File content is not valid base64",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail | Self::DuplicateEmail => "email",
            Self::EmptyFullName | Self::FullNameTooLong => "full_name",
            Self::EmptyComment => "comment",
            Self::SubjectTooLong | Self::SubjectLineBreak | Self::ForbiddenSubject => "subject",
            Self::EmptyBody | Self::ForbiddenBody => "body",
            Self::UnknownMessage | Self::MessageInUse => "message_id",
            Self::EmptyRecipients | Self::UnknownRecipient => "recipient_ids",
            Self::EmptyUsername
            | Self::UsernameTooLong
            | Self::DuplicateUsername
            | Self::ForbiddenUsername => "username",
            Self::ForbiddenFirstName => "first_name",
            Self::PhoneNotDigits | Self::PhoneTooLong => "phone_number",
            Self::AvatarTooLarge | Self::AvatarFormat | Self::AvatarEncoding => "avatar",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a form.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Turns collected errors into a [`ValidationResult`].
pub(crate) fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Returns true if the lower-cased value is exactly a denylisted word.
#[must_use]
pub fn is_denied(value: &str) -> bool {
    let lower = value.to_lowercase();
    DENYLIST.contains(&lower.as_str())
}

/// Basic email validation.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain must contain at least one dot and no empty labels
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    !domain.split('.').any(str::is_empty)
}

/// Number of characters (not bytes) in `value`.
pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}
