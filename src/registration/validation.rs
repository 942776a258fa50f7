use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::registration::policy::RegistrationPolicy;
use crate::registration::types::{DraftRegistration, Field};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is a valid regex")
});

/// Why a field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// Value does not satisfy the field's format rule
    Format,
    /// Value is well formed but already taken in the record store
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn format(message: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Format,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Conflict,
            message: message.into(),
        }
    }
}

/// Per-field validity derived from a draft. Never persisted.
///
/// A field that is missing from the state has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationState {
    fields: BTreeMap<Field, Option<FieldError>>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, result: Result<(), FieldError>) {
        self.fields.insert(field, result.err());
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// `Some(true)` valid, `Some(false)` invalid, `None` not yet checked
    pub fn is_field_valid(&self, field: Field) -> Option<bool> {
        self.fields.get(&field).map(Option::is_none)
    }

    pub fn error(&self, field: Field) -> Option<&FieldError> {
        self.fields.get(&field).and_then(Option::as_ref)
    }

    pub fn message(&self, field: Field) -> Option<&str> {
        self.error(field).map(|e| e.message.as_str())
    }

    /// True when no checked field carries an error
    pub fn is_valid(&self) -> bool {
        self.fields.values().all(Option::is_none)
    }

    pub fn errors(&self) -> impl Iterator<Item = (Field, &FieldError)> {
        self.fields
            .iter()
            .filter_map(|(field, error)| error.as_ref().map(|e| (*field, e)))
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

/// Validate every field of `draft`, collecting all violations.
pub fn validate(draft: &DraftRegistration, policy: &RegistrationPolicy) -> ValidationState {
    let mut state = ValidationState::new();
    for field in Field::ALL {
        if field == Field::Identifier && !policy.identifier.is_enabled() {
            continue;
        }
        state.set(field, validate_field(field, draft, policy));
    }
    state
}

/// Validate a single field. Identifier uniqueness is not checked here.
pub fn validate_field(
    field: Field,
    draft: &DraftRegistration,
    policy: &RegistrationPolicy,
) -> Result<(), FieldError> {
    match field {
        Field::Identifier => check_identifier(&draft.identifier, policy),
        Field::DisplayName => check_display_name(&draft.display_name, policy),
        Field::Email => check_email(&draft.email),
        Field::ContactNumber => check_contact_number(&draft.contact_number, policy),
        Field::HandPreference => Ok(()),
        Field::OwnedProducts => {
            if draft.products.is_empty() {
                Err(FieldError::format("Please select at least one option"))
            } else if draft.products.is_none_only() && !policy.none_satisfies_products {
                Err(FieldError::format("Please select the products you own"))
            } else {
                Ok(())
            }
        }
        Field::Consent => {
            if draft.consent {
                Ok(())
            } else {
                Err(FieldError::format(
                    "You must agree to the Consent & Acknowledgment",
                ))
            }
        }
    }
}

pub fn check_identifier(value: &str, policy: &RegistrationPolicy) -> Result<(), FieldError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(FieldError::format("Username is required"));
    }
    if len < policy.min_identifier_len {
        return Err(FieldError::format(format!(
            "Username must be at least {} characters",
            policy.min_identifier_len
        )));
    }
    Ok(())
}

pub fn check_display_name(value: &str, policy: &RegistrationPolicy) -> Result<(), FieldError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(FieldError::format("Name is required"));
    }
    if len > policy.max_name_len {
        return Err(FieldError::format(format!(
            "Name must be {} characters or fewer",
            policy.max_name_len
        )));
    }
    Ok(())
}

pub fn check_email(value: &str) -> Result<(), FieldError> {
    if EMAIL_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err(FieldError::format("Please enter a valid e-mail address"))
    }
}

pub fn check_contact_number(value: &str, policy: &RegistrationPolicy) -> Result<(), FieldError> {
    if value.trim().chars().count() >= policy.min_contact_len {
        Ok(())
    } else {
        Err(FieldError::format(format!(
            "Contact number must be at least {} characters",
            policy.min_contact_len
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::types::HandPreference;
    use proptest::prelude::*;

    fn valid_draft() -> DraftRegistration {
        DraftRegistration {
            identifier: "tiger".to_string(),
            display_name: "Tiger".to_string(),
            email: "tiger@golf.com".to_string(),
            contact_number: "91234567".to_string(),
            hand: HandPreference::Right,
            products: ["Shoes"].into_iter().collect(),
            consent: true,
        }
    }

    #[test]
    fn test_valid_draft_has_no_errors() {
        let state = validate(&valid_draft(), &RegistrationPolicy::default());
        assert!(state.is_valid());
        assert_eq!(state.is_field_valid(Field::Identifier), Some(true));
        assert_eq!(state.is_field_valid(Field::Consent), Some(true));
    }

    #[test]
    fn test_empty_draft_reports_every_failing_field() {
        let state = validate(&DraftRegistration::new(), &RegistrationPolicy::default());

        assert!(!state.is_valid());
        let failing: Vec<Field> = state.errors().map(|(f, _)| f).collect();
        assert_eq!(
            failing,
            vec![
                Field::Identifier,
                Field::DisplayName,
                Field::Email,
                Field::ContactNumber,
                Field::OwnedProducts,
                Field::Consent,
            ]
        );
        assert_eq!(state.is_field_valid(Field::HandPreference), Some(true));
    }

    #[test]
    fn test_identifier_skipped_when_disabled() {
        let mut draft = valid_draft();
        draft.identifier.clear();
        let state = validate(&draft, &RegistrationPolicy::without_identifier());

        assert!(state.is_valid());
        assert_eq!(state.is_field_valid(Field::Identifier), None);
    }

    #[test]
    fn test_identifier_too_short() {
        let err = check_identifier(" ab ", &RegistrationPolicy::default()).unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::Format);
        assert!(err.message.contains("at least 3"));
        assert!(check_identifier("abc", &RegistrationPolicy::default()).is_ok());
    }

    #[test]
    fn test_email_examples() {
        assert!(check_email("a@b.co").is_ok());
        assert!(check_email("  a@b.co  ").is_ok());
        assert!(check_email("abc").is_err());
        assert!(check_email("abc@def").is_err());
        assert!(check_email("a b@c.d").is_err());
        assert!(check_email("@b.co").is_err());
    }

    #[test]
    fn test_contact_number_counts_after_trim() {
        let policy = RegistrationPolicy::default();
        assert!(check_contact_number("  1234567  ", &policy).is_err());
        assert!(check_contact_number("+65 1234", &policy).is_ok());
    }

    #[test]
    fn test_none_only_products_follow_policy() {
        let mut draft = valid_draft();
        draft.products = ["None"].into_iter().collect();

        let lenient = RegistrationPolicy::default();
        assert!(validate_field(Field::OwnedProducts, &draft, &lenient).is_ok());

        let strict = RegistrationPolicy {
            none_satisfies_products: false,
            ..RegistrationPolicy::default()
        };
        assert!(validate_field(Field::OwnedProducts, &draft, &strict).is_err());
    }

    #[test]
    fn test_consent_required() {
        let mut draft = valid_draft();
        draft.consent = false;
        let state = validate(&draft, &RegistrationPolicy::default());
        assert_eq!(state.error_count(), 1);
        assert!(state.message(Field::Consent).is_some());
    }

    proptest! {
        #[test]
        fn prop_names_within_limit_are_valid(name in "[A-Za-z][A-Za-z ]{0,18}[A-Za-z]|[A-Za-z]") {
            prop_assert!(check_display_name(&name, &RegistrationPolicy::default()).is_ok());
        }

        #[test]
        fn prop_names_over_limit_are_invalid(name in "[A-Za-z]{21,40}") {
            prop_assert!(check_display_name(&name, &RegistrationPolicy::default()).is_err());
        }

        #[test]
        fn prop_blank_names_are_invalid(name in "[ \t]{0,10}") {
            prop_assert!(check_display_name(&name, &RegistrationPolicy::default()).is_err());
        }

        #[test]
        fn prop_shaped_emails_are_valid(
            local in "[a-z0-9._]{1,12}",
            domain in "[a-z0-9-]{1,12}",
            tld in "[a-z]{2,6}",
        ) {
            let email = format!("{local}@{domain}.{tld}");
            prop_assert!(check_email(&email).is_ok());
        }

        #[test]
        fn prop_emails_without_at_are_invalid(text in "[a-z0-9.]{0,30}") {
            prop_assert!(check_email(&text).is_err());
        }

        #[test]
        fn prop_emails_without_dot_after_at_are_invalid(
            local in "[a-z0-9.]{1,12}",
            domain in "[a-z0-9]{1,12}",
        ) {
            let email = format!("{local}@{domain}");
            prop_assert!(check_email(&email).is_err());
        }
    }
}
