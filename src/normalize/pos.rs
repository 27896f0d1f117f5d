use regex::Regex;
use std::sync::LazyLock;

use super::shared::{
    fetch_accounts, finish, first_currency, non_negative, present, required, stamp_envelope,
    Collaborators, PartyCollector,
};
use super::NormalizedTransaction;
use crate::domain::party::{Address, PartyDescription, PartyIdentifiers, PartyName};
use crate::domain::source::{FlowOfFundsEnvelope, PosSourceRecord, SourceSystem};
use crate::domain::transaction::{
    CompletingAction, StartingAction, DIRECTION_OUT, DISPOSITION_PURCHASE, FUNDS_DEBIT_CARD,
    METHOD_IN_PERSON, METHOD_ONLINE,
};
use crate::error::NormalizeError;

static REMOTE_MEMO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(mobile|app)\b").expect("hardcoded regex should be valid"));

/// Method of transaction inferred from the memo line.
pub(crate) fn method_from_memo(memo: Option<&str>) -> &'static str {
    match memo {
        Some(memo) if REMOTE_MEMO.is_match(memo) => METHOD_ONLINE,
        _ => METHOD_IN_PERSON,
    }
}

/// Merchants never carry a party key, so each one resolves with a fresh
/// discriminator.
fn merchant(raw: &PosSourceRecord, name: &str) -> PartyDescription {
    let address = Address {
        street_address: present(raw.merchant_street.as_ref()).map(str::to_string),
        city: present(raw.merchant_city.as_ref()).map(str::to_string),
        province: present(raw.merchant_province.as_ref()).map(str::to_string),
        postal_code: present(raw.merchant_postal_code.as_ref()).map(str::to_string),
        country: present(raw.merchant_country.as_ref()).map(str::to_string),
    };

    PartyDescription {
        name: Some(PartyName::entity(name)),
        address: (!address.is_empty()).then_some(address),
        ..Default::default()
    }
}

/// Point-of-sale debit card purchases.
pub(crate) async fn normalize(
    ctx: Collaborators<'_>,
    raw: &PosSourceRecord,
    envelope: &FlowOfFundsEnvelope,
) -> Result<NormalizedTransaction, NormalizeError> {
    let method = method_from_memo(present(raw.memo_line.as_ref()));
    let mut txn = stamp_envelope(envelope, SourceSystem::Pos, method)?;

    let account = required("account", &raw.account)?;
    let merchant_name = required("merchantName", &raw.merchant_name)?;
    let card_number = present(Some(&raw.card_number));

    let mut warnings = Vec::new();
    let book = fetch_accounts(ctx.accounts, &[Some(account)], &mut warnings).await?;

    let mut parties = PartyCollector::default();
    let holders = parties.keys(&book.holder_keys(Some(account)));
    let card_identifiers = |party_key: Option<&str>| PartyIdentifiers {
        party_key: party_key.map(str::to_string),
        card_number: card_number.map(str::to_string),
        ..Default::default()
    };
    let conductor = match (present(raw.cardholder_party_key.as_ref()), holders.first()) {
        (Some(key), _) => parties.description(PartyDescription {
            identifiers: Some(card_identifiers(Some(key))),
            ..Default::default()
        }),
        (None, Some(holder)) => *holder,
        (None, None) => parties.description(PartyDescription {
            identifiers: Some(card_identifiers(None)),
            ..Default::default()
        }),
    };
    let merchant_slot = parties.description(merchant(raw, merchant_name));

    let resolved = parties.resolve(ctx.identity, &mut warnings).await?;

    let amount = non_negative("amount", &[Some(&raw.amount)])?;
    let currency = first_currency(&[
        raw.currency.as_ref(),
        envelope.flow_of_funds_transaction_currency.as_ref(),
    ]);

    txn.starting_actions.push(StartingAction {
        direction: Some(DIRECTION_OUT.to_string()),
        type_of_funds: Some(FUNDS_DEBIT_CARD.to_string()),
        amount: amount.clone(),
        currency: currency.clone(),
        account: book.descriptor(Some(account), None, None),
        account_holders: resolved.references(&holders),
        conductors: vec![resolved.reference(conductor)],
    });

    txn.completing_actions.push(CompletingAction {
        details_of_disposition: Some(DISPOSITION_PURCHASE.to_string()),
        amount,
        currency,
        beneficiaries: vec![resolved.reference(merchant_slot)],
        ..Default::default()
    });

    Ok(finish(txn, resolved, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_memo() {
        assert_eq!(method_from_memo(Some("Paid via Mobile wallet")), METHOD_ONLINE);
        assert_eq!(method_from_memo(Some("APP purchase")), METHOD_ONLINE);
        assert_eq!(method_from_memo(Some("Happy hour")), METHOD_IN_PERSON);
        assert_eq!(method_from_memo(Some("Store #12 terminal 4")), METHOD_IN_PERSON);
        assert_eq!(method_from_memo(None), METHOD_IN_PERSON);
    }
}
