//! Form field descriptors and their presentation classes.
//!
//! Handlers describe their forms as a list of [`FieldSpec`] and run them
//! through [`FieldStyles`] at the response boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Input widget used for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Email address.
    Email,
    /// Multi-line text.
    Textarea,
    /// Boolean toggle.
    Checkbox,
    /// Single choice from a list.
    Select,
    /// Several choices from a list.
    MultiSelect,
    /// File upload.
    File,
}

/// Static description of one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key in the submitted JSON body.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Widget kind.
    pub kind: FieldKind,
    /// Whether the field must be filled.
    pub required: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, label: &'static str, kind: FieldKind, required: bool) -> Self {
        Self {
            name,
            label,
            kind,
            required,
        }
    }
}

/// Field as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedField {
    /// Key in the submitted JSON body.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Widget kind.
    pub kind: FieldKind,
    /// Whether the field must be filled.
    pub required: bool,
    /// Presentation class.
    pub class: String,
    /// Placeholder text, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Field-kind to class mapping with optional per-field placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStyles {
    /// Class for checkboxes.
    pub checkbox_class: String,
    /// Class for every other widget.
    pub input_class: String,
    placeholders: BTreeMap<String, String>,
}

impl Default for FieldStyles {
    fn default() -> Self {
        Self {
            checkbox_class: "form-check-input".to_string(),
            input_class: "form-control".to_string(),
            placeholders: BTreeMap::new(),
        }
    }
}

impl FieldStyles {
    /// Set the placeholder shown for fields named `field`.
    #[must_use]
    pub fn with_placeholder(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.placeholders.insert(field.into(), text.into());
        self
    }

    /// Class for a widget kind.
    #[must_use]
    pub fn class_for(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::Checkbox => &self.checkbox_class,
            _ => &self.input_class,
        }
    }

    /// Style every field of a form.
    #[must_use]
    pub fn apply(&self, fields: &[FieldSpec]) -> Vec<RenderedField> {
        fields
            .iter()
            .map(|f| RenderedField {
                name: f.name,
                label: f.label,
                kind: f.kind,
                required: f.required,
                class: self.class_for(f.kind).to_string(),
                placeholder: self.placeholders.get(f.name).cloned(),
            })
            .collect()
    }
}

/// Recipient create and edit form.
pub const RECIPIENT_FORM: &[FieldSpec] = &[
    FieldSpec::new("email", "Email", FieldKind::Email, true),
    FieldSpec::new("full_name", "Full name", FieldKind::Text, true),
    FieldSpec::new("comment", "Comment", FieldKind::Textarea, true),
];

/// Message create and edit form.
pub const MESSAGE_FORM: &[FieldSpec] = &[
    FieldSpec::new("subject", "Subject", FieldKind::Text, false),
    FieldSpec::new("body", "Body", FieldKind::Textarea, true),
];

/// Newsletter create and edit form.
pub const NEWSLETTER_FORM: &[FieldSpec] = &[
    FieldSpec::new("message_id", "Message", FieldKind::Select, true),
    FieldSpec::new("recipient_ids", "Recipients", FieldKind::MultiSelect, true),
];

/// Registration form.
pub const USER_FORM: &[FieldSpec] = &[
    FieldSpec::new("email", "Email", FieldKind::Email, true),
    FieldSpec::new("username", "Username", FieldKind::Text, true),
    FieldSpec::new("first_name", "First name", FieldKind::Text, false),
    FieldSpec::new("phone_number", "Phone number", FieldKind::Text, false),
    FieldSpec::new("country", "Country", FieldKind::Text, false),
    FieldSpec::new("avatar", "Avatar", FieldKind::File, false),
];

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkbox_gets_check_class() {
        let styles = FieldStyles::default();
        assert_eq!(styles.class_for(FieldKind::Checkbox), "form-check-input");
        assert_eq!(styles.class_for(FieldKind::Textarea), "form-control");
        assert_eq!(styles.class_for(FieldKind::MultiSelect), "form-control");
    }

    #[test]
    fn test_apply_keeps_order_and_placeholders() {
        let styles = FieldStyles::default().with_placeholder("email", "name@example.com");
        let fields = styles.apply(RECIPIENT_FORM);

        let names: Vec<_> = fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["email", "full_name", "comment"]);
        assert_eq!(fields[0].placeholder.as_deref(), Some("name@example.com"));
        assert!(fields[1].placeholder.is_none());
        assert!(fields.iter().all(|f| f.class == "form-control"));
    }

    #[test]
    fn test_subject_is_optional() {
        let subject = MESSAGE_FORM.iter().find(|f| f.name == "subject").unwrap();
        assert!(!subject.required);
    }
}
