use super::names::parse_party_name;
use super::shared::{
    fetch_accounts, finish, first_currency, non_negative, present, required, stamp_envelope,
    Collaborators, PartyCollector,
};
use super::NormalizedTransaction;
use crate::domain::party::{Address, PartyAccount, PartyDescription, PartyIdentifiers};
use crate::domain::source::{FlowOfFundsEnvelope, SourceSystem, WireSourceRecord};
use crate::domain::transaction::{
    AccountDescriptor, CompletingAction, StartingAction, DIRECTION_IN, DISPOSITION_DEPOSIT,
    FUNDS_INTERNATIONAL_TRANSFER, METHOD_OTHER,
};
use crate::error::NormalizeError;

const RECEIVER_ROLE: &str = "RECEIVER";

fn ordering_customer(raw: &WireSourceRecord) -> PartyDescription {
    let account = present(raw.ordering_customer_account.as_ref());
    let institution = present(raw.ordering_institution.as_ref());
    let address = Address {
        street_address: present(raw.ordering_customer_address.as_ref()).map(str::to_string),
        country: present(raw.ordering_customer_country.as_ref()).map(str::to_string),
        ..Default::default()
    };

    PartyDescription {
        identifiers: present(raw.tag_50.as_ref()).map(|tag| PartyIdentifiers {
            wire_tag_50: Some(tag.to_string()),
            ..Default::default()
        }),
        name: present(raw.ordering_customer_name.as_ref()).and_then(parse_party_name),
        account: account.map(|number| PartyAccount {
            fi_number: institution.map(str::to_string),
            branch: None,
            account: Some(number.to_string()),
        }),
        contact: None,
        address: (!address.is_empty()).then_some(address),
    }
}

/// Incoming wires. Only the receiving side is normalized here.
pub(crate) async fn normalize(
    ctx: Collaborators<'_>,
    raw: &WireSourceRecord,
    envelope: &FlowOfFundsEnvelope,
) -> Result<NormalizedTransaction, NormalizeError> {
    if !raw.role.trim().eq_ignore_ascii_case(RECEIVER_ROLE) {
        return Err(NormalizeError::UnsupportedWireRole(raw.role.clone()));
    }

    let mut txn = stamp_envelope(envelope, SourceSystem::Wire, METHOD_OTHER)?;
    if let Some(remittance) = present(raw.remittance_information.as_ref()) {
        txn.purpose_of_transaction = Some(remittance.to_string());
    }

    let beneficiary_account = required("beneficiaryAccount", &raw.beneficiary_account)?;

    let mut warnings = Vec::new();
    let book = fetch_accounts(ctx.accounts, &[Some(beneficiary_account)], &mut warnings).await?;

    let mut parties = PartyCollector::default();
    let holders = parties.keys(&book.holder_keys(Some(beneficiary_account)));
    let conductor = parties.description(ordering_customer(raw));

    let resolved = parties.resolve(ctx.identity, &mut warnings).await?;

    let amount = non_negative("amount", &[Some(&raw.amount)])?;
    let currency = first_currency(&[
        raw.currency.as_ref(),
        envelope.flow_of_funds_transaction_currency.as_ref(),
    ]);

    txn.starting_actions.push(StartingAction {
        direction: Some(DIRECTION_IN.to_string()),
        type_of_funds: Some(FUNDS_INTERNATIONAL_TRANSFER.to_string()),
        amount: amount.clone(),
        currency: currency.clone(),
        account: AccountDescriptor {
            fi_number: present(raw.ordering_institution.as_ref()).map(str::to_string),
            account: present(raw.ordering_customer_account.as_ref()).map(str::to_string),
            ..Default::default()
        },
        account_holders: Vec::new(),
        conductors: vec![resolved.reference(conductor)],
    });

    txn.completing_actions.push(CompletingAction {
        details_of_disposition: Some(DISPOSITION_DEPOSIT.to_string()),
        amount,
        currency,
        account: book.descriptor(Some(beneficiary_account), None, None),
        account_holders: resolved.references(&holders),
        beneficiaries: resolved.references(&holders),
    });

    Ok(finish(txn, resolved, warnings))
}
