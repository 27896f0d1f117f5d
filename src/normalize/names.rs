//! Free-text name parsing for parties synthesized from raw sender, recipient
//! and ordering-customer fields.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::party::PartyName;

static BUSINESS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(inc|incorporated|ltd|ltee|limited|llc|llp|lp|corp|corporation|co|company|bank|trust|group|holdings|enterprises|plc|gmbh|credit\s+union)\b\.?",
    )
    .expect("hardcoded regex should be valid")
});

/// Whether the text looks like a business name.
pub fn is_business_name(raw: &str) -> bool {
    BUSINESS_SUFFIX.is_match(raw)
}

/// Splits a free-text name into party name fields.
///
/// Business names become `name_of_entity`. Person names map the first token to
/// the given name, the last token to the surname and anything in between to
/// `other_or_initial`. A single token is taken as the surname.
pub fn parse_party_name(raw: &str) -> Option<PartyName> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let collapsed = tokens.join(" ");
    if is_business_name(&collapsed) {
        return Some(PartyName::entity(collapsed));
    }

    let name = match tokens.as_slice() {
        [only] => PartyName {
            surname: Some(only.to_string()),
            ..Default::default()
        },
        [first, middle @ .., last] => PartyName {
            given_name: Some(first.to_string()),
            other_or_initial: if middle.is_empty() {
                None
            } else {
                Some(middle.join(" "))
            },
            surname: Some(last.to_string()),
            name_of_entity: None,
        },
        [] => return None,
    };

    Some(name)
}
