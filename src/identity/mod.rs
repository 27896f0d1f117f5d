//! Identity resolution.
//!
//! A party's identifier is derived on every call from its identifying fields:
//! the trimmed party key when present, the canonical form of the description
//! when only secondary identifiers are known, and a random discriminator
//! otherwise. Nothing is cached, so two normalizer calls that see the same
//! party key agree on the identifier without sharing state.

pub mod canonical;

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::party::{Party, PartyDescription};
use crate::error::LookupError;
use crate::ports::PartyLookup;
use crate::utils::sanitize::mask_identifier;

pub use canonical::{canonical_json, sha256_hex, to_canonical_json};

/// Outcome of a resolution, including whether the party lookup missed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub party: Party,
    /// Set when a party key was present but the lookup answered not-found.
    pub not_found_key: Option<String>,
}

#[derive(Clone)]
pub struct IdentityResolver {
    party_lookup: Arc<dyn PartyLookup>,
}

impl IdentityResolver {
    pub fn new(party_lookup: Arc<dyn PartyLookup>) -> Self {
        Self { party_lookup }
    }

    /// Resolves a partial description into a party.
    ///
    /// Not-found lookups are recovered locally; transport class failures are
    /// returned so the caller can abort assembly.
    pub async fn resolve(&self, partial: PartyDescription) -> Result<Party, LookupError> {
        Ok(self.resolve_detailed(partial).await?.party)
    }

    pub async fn resolve_detailed(
        &self,
        partial: PartyDescription,
    ) -> Result<Resolution, LookupError> {
        if let Some(key) = partial.party_key().map(str::to_string) {
            return self.resolve_keyed(key, partial).await;
        }

        if partial.has_secondary_identifier() {
            let party_identifier = sha256_hex(&canonical_description(&partial, None));
            return Ok(Resolution {
                party: build_party(party_identifier, None, partial),
                not_found_key: None,
            });
        }

        Ok(Resolution {
            party: anonymous_party(partial),
            not_found_key: None,
        })
    }

    async fn resolve_keyed(
        &self,
        key: String,
        mut partial: PartyDescription,
    ) -> Result<Resolution, LookupError> {
        let party_identifier = sha256_hex(&key);
        let mut not_found_key = None;

        match self.party_lookup.get_party_info(&key).await {
            Ok(info) => {
                let name = info.into_name();
                if !name.is_empty() {
                    partial.name = Some(name);
                }
            }
            Err(LookupError::NotFound(_)) => {
                tracing::warn!(
                    "Party {} not found in party lookup, keeping local fields",
                    mask_identifier(&key)
                );
                not_found_key = Some(key);
            }
            Err(e) => {
                tracing::error!(
                    "Party lookup failed for {}: {}",
                    mask_identifier(&key),
                    e
                );
                return Err(e);
            }
        }

        Ok(Resolution {
            party: build_party(party_identifier, None, partial),
            not_found_key,
        })
    }
}

/// A party with no identifying field. The random discriminator keeps it from
/// being unified with any other anonymous party.
pub fn anonymous_party(partial: PartyDescription) -> Party {
    let discriminator = Uuid::new_v4().to_string();
    let party_identifier = sha256_hex(&canonical_description(&partial, Some(&discriminator)));
    build_party(party_identifier, Some(discriminator), partial)
}

fn canonical_description(partial: &PartyDescription, discriminator: Option<&str>) -> String {
    // Plain string fields always serialize; Null only guards the signature.
    let mut value = serde_json::to_value(partial).unwrap_or_default();
    if let (Some(seed), Value::Object(map)) = (discriminator, &mut value) {
        map.insert("discriminatorKey".to_string(), Value::String(seed.to_string()));
    }
    canonical_json(&value)
}

fn build_party(
    party_identifier: String,
    discriminator_key: Option<String>,
    partial: PartyDescription,
) -> Party {
    Party {
        party_identifier,
        discriminator_key,
        identifiers: partial.identifiers,
        name: partial.name,
        account: partial.account,
        contact: partial.contact,
        address: partial.address,
    }
}
