//! User model types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Create a new user ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named grant that widens what a user may see or do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// See every recipient, not only owned ones.
    ViewAllRecipients,
    /// See every message, not only owned ones.
    ViewAllMessages,
    /// See every newsletter, not only owned ones.
    ViewAllNewsletters,
    /// See every send attempt, not only owned ones.
    ViewAllAttempts,
    /// Block and unblock newsletters.
    DisableNewsletters,
    /// Delete messages owned by others.
    DeleteMessage,
    /// Delete recipients owned by others.
    DeleteRecipient,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::ViewAllRecipients,
        Self::ViewAllMessages,
        Self::ViewAllNewsletters,
        Self::ViewAllAttempts,
        Self::DisableNewsletters,
        Self::DeleteMessage,
        Self::DeleteRecipient,
    ];

    /// Stored identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ViewAllRecipients => "view_all_recipients",
            Self::ViewAllMessages => "view_all_messages",
            Self::ViewAllNewsletters => "view_all_newsletters",
            Self::ViewAllAttempts => "view_all_attempts",
            Self::DisableNewsletters => "disable_newsletters",
            Self::DeleteMessage => "delete_message",
            Self::DeleteRecipient => "delete_recipient",
        }
    }

    /// Parse a stored identifier.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Human-readable description.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::ViewAllRecipients => "Can view all recipients",
            Self::ViewAllMessages => "Can view all messages",
            Self::ViewAllNewsletters => "Can view all newsletters",
            Self::ViewAllAttempts => "Can view all attempts",
            Self::DisableNewsletters => "Can disable newsletters",
            Self::DeleteMessage => "Can delete messages",
            Self::DeleteRecipient => "Can delete recipients",
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Database ID.
    pub id: UserId,
    /// Unique email address.
    pub email: String,
    /// Unique login name.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Phone number, digits only.
    pub phone_number: Option<String>,
    /// Country of residence.
    pub country: String,
    /// File name of the uploaded avatar, if any.
    pub avatar: Option<String>,
    /// API token presented as `Authorization: Bearer`.
    #[serde(skip_serializing)]
    pub token: String,
    /// Operator flag.
    pub is_staff: bool,
    /// Holds every permission implicitly.
    pub is_superuser: bool,
    /// Explicit permission grants.
    pub permissions: BTreeSet<Permission>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true if the user holds the permission, directly or as superuser.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_superuser || self.permissions.contains(&permission)
    }
}

/// Avatar image supplied with a registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarUpload {
    /// Original file name; its extension decides the accepted format.
    pub name: String,
    /// Base64-encoded file content.
    pub content: String,
}

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Optional phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Country of residence.
    #[serde(default)]
    pub country: String,
    /// Optional avatar.
    #[serde(default)]
    pub avatar: Option<AvatarUpload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_parse_roundtrip() {
        for permission in Permission::ALL {
            assert_eq!(Permission::parse(permission.as_str()), Some(permission));
        }
        assert_eq!(Permission::parse("fly"), None);
    }

    #[test]
    fn test_superuser_has_every_permission() {
        let user = User {
            id: UserId(1),
            email: "root@example.com".into(),
            username: "root".into(),
            first_name: String::new(),
            phone_number: None,
            country: String::new(),
            avatar: None,
            token: "t".into(),
            is_staff: false,
            is_superuser: true,
            permissions: BTreeSet::new(),
            created_at: Utc::now(),
        };
        assert!(Permission::ALL.iter().all(|p| user.has_permission(*p)));
    }
}
