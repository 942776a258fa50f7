use serde::{Deserialize, Serialize};

/// Record field the identifier is written under and queried by
pub const IDENTIFIER_FIELD: &str = "username";

/// How the identifier (username) field participates in a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierPolicy {
    /// Identifier must be supplied and must be unique in the store
    #[default]
    Required,
    /// Form has no identifier; no uniqueness check is made
    Disabled,
}

impl IdentifierPolicy {
    pub fn is_enabled(&self) -> bool {
        matches!(self, IdentifierPolicy::Required)
    }

    /// Record field the uniqueness query runs against
    pub fn store_field(&self) -> Option<&'static str> {
        match self {
            IdentifierPolicy::Required => Some(IDENTIFIER_FIELD),
            IdentifierPolicy::Disabled => None,
        }
    }
}

/// Rules a draft is validated against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationPolicy {
    pub identifier: IdentifierPolicy,
    /// Minimum identifier length after trimming
    pub min_identifier_len: usize,
    /// Maximum display name length after trimming
    pub max_name_len: usize,
    /// Minimum contact number length after trimming
    pub min_contact_len: usize,
    /// Whether selecting only "None" answers the products question
    pub none_satisfies_products: bool,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            identifier: IdentifierPolicy::default(),
            min_identifier_len: 3,
            max_name_len: 20,
            min_contact_len: 8,
            none_satisfies_products: true,
        }
    }
}

impl RegistrationPolicy {
    /// Policy for the form variant without a username field
    pub fn without_identifier() -> Self {
        Self {
            identifier: IdentifierPolicy::Disabled,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_checks_username() {
        let policy = RegistrationPolicy::default();
        assert!(policy.identifier.is_enabled());
        assert_eq!(policy.identifier.store_field(), Some("username"));
        assert_eq!(policy.max_name_len, 20);
        assert!(policy.none_satisfies_products);
    }

    #[test]
    fn test_policy_toml_round_trip_keeps_identifier_mode() {
        let policy = RegistrationPolicy::without_identifier();
        let text = toml::to_string(&policy).unwrap();
        assert!(text.contains("identifier = \"disabled\""));

        let parsed: RegistrationPolicy = toml::from_str(&text).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_partial_policy_falls_back_to_defaults() {
        let parsed: RegistrationPolicy = toml::from_str("min_contact_len = 10").unwrap();
        assert_eq!(parsed.min_contact_len, 10);
        assert_eq!(parsed.max_name_len, 20);
        assert!(parsed.identifier.is_enabled());
    }
}
