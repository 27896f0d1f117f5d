//! Party domain entity.
//! A party is a resolved identity for a person or entity. Transactions only
//! ever reference parties through their `party_identifier`.

use serde::{Deserialize, Serialize};

/// Cross-system keys that identify a party. Any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyIdentifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_key: Option<String>,
    /// E-transfer (Interac/CertaPay) account handle, usually an e-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certapay_account: Option<String>,
    /// Wire tag 50 (ordering customer) free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_tag_50: Option<String>,
    /// Wire tag 59 (beneficiary customer) free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_tag_59: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
}

impl PartyIdentifiers {
    pub fn with_party_key(party_key: impl Into<String>) -> Self {
        Self {
            party_key: Some(party_key.into()),
            ..Default::default()
        }
    }

    /// Trimmed party key, if one is present and non-blank.
    pub fn trimmed_party_key(&self) -> Option<&str> {
        self.party_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Whether any identifier other than the party key carries a value.
    pub fn has_secondary_identifier(&self) -> bool {
        [
            &self.certapay_account,
            &self.wire_tag_50,
            &self.wire_tag_59,
            &self.card_number,
        ]
        .iter()
        .any(|value| value.as_deref().map_or(false, |v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_or_initial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_of_entity: Option<String>,
}

impl PartyName {
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            name_of_entity: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.surname.is_none()
            && self.given_name.is_none()
            && self.other_or_initial.is_none()
            && self.name_of_entity.is_none()
    }

    /// Human readable form: entity name, or "Given Other Surname".
    pub fn display_name(&self) -> Option<String> {
        if let Some(entity) = &self.name_of_entity {
            return Some(entity.clone());
        }

        let parts: Vec<&str> = [&self.given_name, &self.other_or_initial, &self.surname]
            .iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fi_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        *self == Address::default()
    }
}

/// A partial party description as produced by a source normalizer, before
/// identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<PartyIdentifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PartyName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<PartyAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl PartyDescription {
    pub fn from_party_key(party_key: impl Into<String>) -> Self {
        Self {
            identifiers: Some(PartyIdentifiers::with_party_key(party_key)),
            ..Default::default()
        }
    }

    pub fn party_key(&self) -> Option<&str> {
        self.identifiers
            .as_ref()
            .and_then(PartyIdentifiers::trimmed_party_key)
    }

    pub fn has_secondary_identifier(&self) -> bool {
        self.identifiers
            .as_ref()
            .map_or(false, PartyIdentifiers::has_secondary_identifier)
    }
}

/// A resolved identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub party_identifier: String,
    /// Random seed assigned when the description carried no identifying field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<PartyIdentifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PartyName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<PartyAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl Party {
    pub fn display_name(&self) -> Option<String> {
        self.name.as_ref().and_then(PartyName::display_name)
    }

    pub fn to_ref(&self) -> PartyRef {
        PartyRef::new(self.party_identifier.clone())
    }
}

/// Reference to a party from a starting or completing action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRef {
    pub party_identifier: String,
}

impl PartyRef {
    pub fn new(party_identifier: impl Into<String>) -> Self {
        Self {
            party_identifier: party_identifier.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_party_key_ignores_blank() {
        let ids = PartyIdentifiers::with_party_key("   ");
        assert_eq!(ids.trimmed_party_key(), None);

        let ids = PartyIdentifiers::with_party_key("  P1 ");
        assert_eq!(ids.trimmed_party_key(), Some("P1"));
    }

    #[test]
    fn test_secondary_identifier_detection() {
        let mut ids = PartyIdentifiers::with_party_key("P1");
        assert!(!ids.has_secondary_identifier());

        ids.card_number = Some("4500********1234".to_string());
        assert!(ids.has_secondary_identifier());
    }

    #[test]
    fn test_display_name() {
        let person = PartyName {
            surname: Some("Tremblay".to_string()),
            given_name: Some("Marie".to_string()),
            other_or_initial: Some("J".to_string()),
            name_of_entity: None,
        };
        assert_eq!(person.display_name().as_deref(), Some("Marie J Tremblay"));

        let entity = PartyName::entity("Northwind Trading Inc");
        assert_eq!(entity.display_name().as_deref(), Some("Northwind Trading Inc"));

        assert_eq!(PartyName::default().display_name(), None);
    }

    #[test]
    fn test_description_serializes_camel_case_without_nulls() {
        let desc = PartyDescription::from_party_key("P1");
        let json = serde_json::to_string(&desc).unwrap();
        assert_eq!(json, r#"{"identifiers":{"partyKey":"P1"}}"#);
    }
}
