use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::registration::policy::RegistrationPolicy;

/// Tag meaning "I have never owned any of the products".
pub const NO_PRODUCTS_TAG: &str = "None";

/// Form fields that carry their own validity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Identifier,
    DisplayName,
    Email,
    ContactNumber,
    HandPreference,
    OwnedProducts,
    Consent,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Identifier,
        Field::DisplayName,
        Field::Email,
        Field::ContactNumber,
        Field::HandPreference,
        Field::OwnedProducts,
        Field::Consent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Identifier => "identifier",
            Field::DisplayName => "display_name",
            Field::Email => "email",
            Field::ContactNumber => "contact_number",
            Field::HandPreference => "hand_preference",
            Field::OwnedProducts => "owned_products",
            Field::Consent => "consent",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred swing hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandPreference {
    Left,
    #[default]
    Right,
}

impl HandPreference {
    pub fn is_left(&self) -> bool {
        matches!(self, HandPreference::Left)
    }
}

impl std::str::FromStr for HandPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(HandPreference::Left),
            "right" => Ok(HandPreference::Right),
            other => Err(format!("unknown hand preference '{other}' (expected left or right)")),
        }
    }
}

/// Set of owned-product tags where "None" excludes every other tag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnedProducts(BTreeSet<String>);

impl OwnedProducts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a tag on or off, keeping "None" exclusive.
    pub fn toggle(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }

        if self.0.remove(tag) {
            return;
        }

        if tag == NO_PRODUCTS_TAG {
            self.0.clear();
        } else {
            self.0.remove(NO_PRODUCTS_TAG);
        }
        self.0.insert(tag.to_string());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the only selection is the "None" tag
    pub fn is_none_only(&self) -> bool {
        self.0.len() == 1 && self.0.contains(NO_PRODUCTS_TAG)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<'a> FromIterator<&'a str> for OwnedProducts {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut products = OwnedProducts::new();
        for tag in iter {
            if !products.contains(tag.trim()) {
                products.toggle(tag);
            }
        }
        products
    }
}

/// Unsaved form data for the current session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DraftRegistration {
    pub identifier: String,
    pub display_name: String,
    pub email: String,
    pub contact_number: String,
    pub hand: HandPreference,
    pub products: OwnedProducts,
    pub consent: bool,
}

impl DraftRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every field still holds its initial value
    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }
}

/// A single field mutation coming from the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Identifier(String),
    DisplayName(String),
    Email(String),
    ContactNumber(String),
    Hand(HandPreference),
    Consent(bool),
}

impl FieldUpdate {
    pub fn field(&self) -> Field {
        match self {
            FieldUpdate::Identifier(_) => Field::Identifier,
            FieldUpdate::DisplayName(_) => Field::DisplayName,
            FieldUpdate::Email(_) => Field::Email,
            FieldUpdate::ContactNumber(_) => Field::ContactNumber,
            FieldUpdate::Hand(_) => Field::HandPreference,
            FieldUpdate::Consent(_) => Field::Consent,
        }
    }

    pub(crate) fn apply(self, draft: &mut DraftRegistration) {
        match self {
            FieldUpdate::Identifier(v) => draft.identifier = v,
            FieldUpdate::DisplayName(v) => draft.display_name = v,
            FieldUpdate::Email(v) => draft.email = v,
            FieldUpdate::ContactNumber(v) => draft.contact_number = v,
            FieldUpdate::Hand(v) => draft.hand = v,
            FieldUpdate::Consent(v) => draft.consent = v,
        }
    }
}

/// Opaque id handed back by a record store after an append
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new_v4() -> Self {
        RecordId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record persisted once a submission passes every check.
///
/// Strings are trimmed. The identifier is written under `username`, the
/// same key `exists("username", ..)` queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRegistration {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    pub name: String,
    pub email: String,
    pub contact: String,
    pub hand: HandPreference,
    pub is_left_hand: bool,
    pub products: Vec<String>,
    pub consent: bool,
    pub registered_at: DateTime<Utc>,
}

impl StoredRegistration {
    pub fn from_draft(
        draft: &DraftRegistration,
        policy: &RegistrationPolicy,
        registered_at: DateTime<Utc>,
    ) -> Self {
        let username = policy
            .identifier
            .is_enabled()
            .then(|| draft.identifier.trim().to_string());

        Self {
            username,
            name: draft.display_name.trim().to_string(),
            email: draft.email.trim().to_string(),
            contact: draft.contact_number.trim().to_string(),
            hand: draft.hand,
            is_left_hand: draft.hand.is_left(),
            products: draft.products.iter().map(str::to_string).collect(),
            consent: draft.consent,
            registered_at,
        }
    }
}

/// What the caller gets back from a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub record_id: RecordId,
    pub identifier: Option<String>,
    pub display_name: String,
}

impl SubmissionReceipt {
    pub fn confirmation_message(&self) -> String {
        match &self.identifier {
            Some(username) => format!(
                "Registration successful! Remember your username {username} for registration later."
            ),
            None => format!("Registration successful! Thank you, {}.", self.display_name),
        }
    }
}
