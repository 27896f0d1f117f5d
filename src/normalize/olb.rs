use super::names::parse_party_name;
use super::shared::{
    fetch_accounts, finish, first_currency, non_negative, present, required, stamp_envelope,
    AccountBook, Collaborators, PartyCollector, Slot,
};
use super::NormalizedTransaction;
use crate::domain::party::{Contact, PartyDescription, PartyIdentifiers};
use crate::domain::source::{FlowOfFundsEnvelope, OlbSourceRecord, SourceSystem, TransferDirection};
use crate::domain::transaction::{
    AccountDescriptor, CompletingAction, StartingAction, DIRECTION_IN, DIRECTION_OUT,
    DISPOSITION_DEPOSIT, DISPOSITION_OUTGOING_EMAIL_TRANSFER, FUNDS_EMAIL_TRANSFER,
    FUNDS_WITHDRAWAL, METHOD_ONLINE,
};
use crate::error::NormalizeError;

/// Party built from the raw name and e-mail of an external e-transfer handle.
fn external_party(name: Option<&String>, email: Option<&String>) -> PartyDescription {
    let email = present(email).map(str::to_string);
    PartyDescription {
        identifiers: email.clone().map(|handle| PartyIdentifiers {
            certapay_account: Some(handle),
            ..Default::default()
        }),
        name: present(name).and_then(parse_party_name),
        contact: email.map(|address| Contact {
            email: Some(address),
            telephone: None,
        }),
        ..Default::default()
    }
}

/// The counterparty side of the transfer.
enum Counterparty<'a> {
    /// A customer account of this institution with known holders.
    Internal { account: &'a str, holders: Vec<Slot> },
    External(Slot),
}

fn counterparty<'a>(
    raw: &'a OlbSourceRecord,
    book: &AccountBook,
    parties: &mut PartyCollector,
) -> Counterparty<'a> {
    let account = present(raw.counterparty_account.as_ref());
    let holder_keys = book.holder_keys(account);

    match account {
        Some(account) if !holder_keys.is_empty() => Counterparty::Internal {
            account,
            holders: parties.keys(&holder_keys),
        },
        _ => {
            let external = match raw.direction {
                TransferDirection::Incoming => {
                    external_party(raw.sender_name.as_ref(), raw.sender_email.as_ref())
                }
                TransferDirection::Outgoing => {
                    external_party(raw.recipient_name.as_ref(), raw.recipient_email.as_ref())
                }
            };
            Counterparty::External(parties.description(external))
        }
    }
}

/// Online banking e-transfers: incoming or outgoing, to an internal account
/// or to an external handle.
pub(crate) async fn normalize(
    ctx: Collaborators<'_>,
    raw: &OlbSourceRecord,
    envelope: &FlowOfFundsEnvelope,
) -> Result<NormalizedTransaction, NormalizeError> {
    let mut txn = stamp_envelope(envelope, SourceSystem::Olb, METHOD_ONLINE)?;
    if let Some(reference) = present(raw.emt_reference.as_ref()) {
        txn.reporting_entity_txn_ref_no = Some(reference.to_string());
    }

    let customer_account = required("customerAccount", &raw.customer_account)?;
    let counterparty_account = present(raw.counterparty_account.as_ref());

    let mut warnings = Vec::new();
    let book = fetch_accounts(
        ctx.accounts,
        &[Some(customer_account), counterparty_account],
        &mut warnings,
    )
    .await?;

    let mut parties = PartyCollector::default();
    let customer_holders = parties.keys(&book.holder_keys(Some(customer_account)));
    let customer = match present(raw.customer_party_key.as_ref()) {
        Some(key) => parties.key(key),
        None => match customer_holders.first() {
            Some(holder) => *holder,
            None => {
                let own = match raw.direction {
                    TransferDirection::Outgoing => {
                        external_party(raw.sender_name.as_ref(), raw.sender_email.as_ref())
                    }
                    TransferDirection::Incoming => {
                        external_party(raw.recipient_name.as_ref(), raw.recipient_email.as_ref())
                    }
                };
                parties.description(own)
            }
        },
    };
    let other = counterparty(raw, &book, &mut parties);
    parties.keys(&book.all_holder_keys());

    let resolved = parties.resolve(ctx.identity, &mut warnings).await?;

    let amount = non_negative("amount", &[Some(&raw.amount)])?;
    let currency = first_currency(&[
        raw.currency.as_ref(),
        envelope.flow_of_funds_transaction_currency.as_ref(),
    ]);
    let customer_descriptor = book.descriptor(Some(customer_account), None, None);
    let customer_refs = if customer_holders.is_empty() {
        vec![resolved.reference(customer)]
    } else {
        resolved.references(&customer_holders)
    };

    let (starting, completing) = match raw.direction {
        TransferDirection::Outgoing => {
            let starting = StartingAction {
                direction: Some(DIRECTION_OUT.to_string()),
                type_of_funds: Some(FUNDS_WITHDRAWAL.to_string()),
                account: customer_descriptor,
                account_holders: resolved.references(&customer_holders),
                conductors: vec![resolved.reference(customer)],
                ..Default::default()
            };
            let completing = match &other {
                Counterparty::Internal { account, holders } => CompletingAction {
                    account: book.descriptor(Some(*account), None, None),
                    account_holders: resolved.references(holders),
                    beneficiaries: resolved.references(holders),
                    ..Default::default()
                },
                Counterparty::External(slot) => CompletingAction {
                    beneficiaries: vec![resolved.reference(*slot)],
                    ..Default::default()
                },
            };
            (
                starting,
                CompletingAction {
                    details_of_disposition: Some(DISPOSITION_OUTGOING_EMAIL_TRANSFER.to_string()),
                    ..completing
                },
            )
        }
        TransferDirection::Incoming => {
            let starting = match &other {
                Counterparty::Internal { account, holders } => StartingAction {
                    account: book.descriptor(Some(*account), None, None),
                    account_holders: resolved.references(holders),
                    conductors: resolved.references(&holders[..1]),
                    ..Default::default()
                },
                Counterparty::External(slot) => StartingAction {
                    account: AccountDescriptor::default(),
                    conductors: vec![resolved.reference(*slot)],
                    ..Default::default()
                },
            };
            (
                StartingAction {
                    direction: Some(DIRECTION_IN.to_string()),
                    type_of_funds: Some(FUNDS_EMAIL_TRANSFER.to_string()),
                    ..starting
                },
                CompletingAction {
                    details_of_disposition: Some(DISPOSITION_DEPOSIT.to_string()),
                    account: customer_descriptor,
                    account_holders: resolved.references(&customer_holders),
                    beneficiaries: customer_refs,
                    ..Default::default()
                },
            )
        }
    };

    txn.starting_actions.push(StartingAction {
        amount: amount.clone(),
        currency: currency.clone(),
        ..starting
    });
    txn.completing_actions.push(CompletingAction {
        amount,
        currency,
        ..completing
    });

    Ok(finish(txn, resolved, warnings))
}
