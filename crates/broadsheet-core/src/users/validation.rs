//! Registration form validation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::model::{AvatarUpload, NewUser};
use crate::validation::{
    ValidationError, ValidationResult, char_len, finish, is_denied, is_valid_email,
};

const MAX_USERNAME_LEN: usize = 50;
const MAX_PHONE_LEN: usize = 15;
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;
const AVATAR_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Validate a registration form.
///
/// Uniqueness of email and username is checked by the repository.
///
/// # Errors
///
/// Returns every validation error found.
pub fn validate_registration(form: &NewUser) -> ValidationResult {
    let mut errors = Vec::new();

    let email = form.email.trim();
    if email.is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(email) {
        errors.push(ValidationError::InvalidEmail);
    }

    let username = form.username.trim();
    if username.is_empty() {
        errors.push(ValidationError::EmptyUsername);
    } else if char_len(username) > MAX_USERNAME_LEN {
        errors.push(ValidationError::UsernameTooLong);
    }

    let first_name = form.first_name.trim();
    if !username.is_empty() && !first_name.is_empty() && (is_denied(username) || is_denied(first_name))
    {
        errors.push(ValidationError::ForbiddenUsername);
        errors.push(ValidationError::ForbiddenFirstName);
    }

    if let Some(phone) = form.phone_number.as_deref().filter(|p| !p.is_empty()) {
        if !phone.chars().all(|c| c.is_ascii_digit()) {
            errors.push(ValidationError::PhoneNotDigits);
        }
        if char_len(phone) > MAX_PHONE_LEN {
            errors.push(ValidationError::PhoneTooLong);
        }
    }

    if let Some(avatar) = &form.avatar
        && let Err(e) = decode_avatar(avatar)
    {
        errors.push(e);
    }

    finish(errors)
}

/// Decode and check an avatar upload.
pub(crate) fn decode_avatar(avatar: &AvatarUpload) -> Result<Vec<u8>, ValidationError> {
    let name = avatar.name.to_lowercase();
    if !AVATAR_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        return Err(ValidationError::AvatarFormat);
    }

    let bytes = STANDARD
        .decode(avatar.content.trim())
        .map_err(|_| ValidationError::AvatarEncoding)?;
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(ValidationError::AvatarTooLarge);
    }
    Ok(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> NewUser {
        NewUser {
            email: "ann@example.com".into(),
            username: "ann".into(),
            first_name: "Ann".into(),
            ..NewUser::default()
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration(&form()).is_ok());
    }

    #[test]
    fn test_denied_username_marks_both_fields() {
        let mut f = form();
        f.username = "Казино".into();
        let errors = validate_registration(&f).unwrap_err();
        assert!(errors.contains(&ValidationError::ForbiddenUsername));
        assert!(errors.contains(&ValidationError::ForbiddenFirstName));
    }

    #[test]
    fn test_denylist_skipped_without_first_name() {
        let mut f = form();
        f.username = "радар".into();
        f.first_name = String::new();
        assert!(validate_registration(&f).is_ok());
    }

    #[test]
    fn test_username_length() {
        let mut f = form();
        f.username = "u".repeat(51);
        assert_eq!(
            validate_registration(&f).unwrap_err(),
            vec![ValidationError::UsernameTooLong]
        );
    }

    #[test]
    fn test_phone_rules() {
        let mut f = form();
        f.phone_number = Some("+7 900".into());
        assert_eq!(
            validate_registration(&f).unwrap_err(),
            vec![ValidationError::PhoneNotDigits]
        );

        f.phone_number = Some("1".repeat(16));
        assert_eq!(
            validate_registration(&f).unwrap_err(),
            vec![ValidationError::PhoneTooLong]
        );

        f.phone_number = Some("79001234567".into());
        assert!(validate_registration(&f).is_ok());
    }

    #[test]
    fn test_avatar_rules() {
        let gif = AvatarUpload {
            name: "me.gif".into(),
            content: STANDARD.encode(b"GIF89a"),
        };
        assert_eq!(decode_avatar(&gif), Err(ValidationError::AvatarFormat));

        let garbage = AvatarUpload {
            name: "me.png".into(),
            content: "!!!".into(),
        };
        assert_eq!(decode_avatar(&garbage), Err(ValidationError::AvatarEncoding));

        let big = AvatarUpload {
            name: "me.JPG".into(),
            content: STANDARD.encode(vec![0u8; MAX_AVATAR_BYTES + 1]),
        };
        assert_eq!(decode_avatar(&big), Err(ValidationError::AvatarTooLarge));

        let ok = AvatarUpload {
            name: "me.jpeg".into(),
            content: STANDARD.encode(b"\xff\xd8\xff"),
        };
        assert_eq!(decode_avatar(&ok).unwrap(), b"\xff\xd8\xff".to_vec());
    }

    #[test]
    fn test_missing_email() {
        let mut f = form();
        f.email = "  ".into();
        assert_eq!(
            validate_registration(&f).unwrap_err(),
            vec![ValidationError::EmptyEmail]
        );
    }
}
