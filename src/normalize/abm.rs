use super::shared::{
    fetch_accounts, finish, first_currency, is_cash_withdrawal, non_negative, present, required,
    stamp_envelope, Collaborators, PartyCollector,
};
use super::NormalizedTransaction;
use crate::domain::party::{PartyDescription, PartyIdentifiers};
use crate::domain::source::{AbmSourceRecord, FlowOfFundsEnvelope, SourceSystem};
use crate::domain::transaction::{
    AccountDescriptor, CompletingAction, StartingAction, FUNDS_CASH, FUNDS_WITHDRAWAL, METHOD_ABM,
};
use crate::error::NormalizeError;

/// ABM: one starting and one completing action with exactly one conductor.
/// A cash withdrawal puts the conductor in the beneficiary slot.
pub(crate) async fn normalize(
    ctx: Collaborators<'_>,
    raw: &AbmSourceRecord,
    envelope: &FlowOfFundsEnvelope,
) -> Result<NormalizedTransaction, NormalizeError> {
    let mut txn = stamp_envelope(envelope, SourceSystem::Abm, METHOD_ABM)?;
    let direction = required("strSaDirection", &raw.str_sa_direction)?;
    let disposition = required("strCaDispositionType", &raw.str_ca_disposition_type)?;
    let withdrawal = is_cash_withdrawal(disposition);
    if txn.reporting_entity_location_no.is_none() {
        txn.reporting_entity_location_no = present(raw.terminal_id.as_ref()).map(str::to_string);
    }

    let sa_account = present(raw.str_sa_account.as_ref());
    let ca_account = present(raw.str_ca_account.as_ref());

    let mut warnings = Vec::new();
    let book = fetch_accounts(ctx.accounts, &[sa_account, ca_account], &mut warnings).await?;

    let sa_holder_keys = book.holder_keys(sa_account);
    let deposit_account = ca_account.or(sa_account);
    let ca_holder_keys = book.holder_keys(deposit_account);

    let mut parties = PartyCollector::default();
    let sa_holders = parties.keys(&sa_holder_keys);
    let ca_holders = parties.keys(&ca_holder_keys);
    parties.keys(&book.all_holder_keys());

    let conductor = match sa_holders.first().or(ca_holders.first()) {
        Some(holder) => *holder,
        None => parties.description(PartyDescription {
            identifiers: present(raw.card_number.as_ref()).map(|card| PartyIdentifiers {
                card_number: Some(card.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
    };

    let resolved = parties.resolve(ctx.identity, &mut warnings).await?;

    let sa_amount = non_negative(
        "strSaAmount",
        &[
            raw.str_sa_amount.as_ref(),
            envelope.flow_of_funds_debit_amount.as_ref(),
            envelope.flow_of_funds_credit_amount.as_ref(),
        ],
    )?;
    let ca_amount = non_negative(
        "strCaAmount",
        &[raw.str_ca_amount.as_ref(), sa_amount.as_ref()],
    )?;
    let currency_fallback = envelope.flow_of_funds_transaction_currency.as_ref();

    let default_funds = if withdrawal { FUNDS_WITHDRAWAL } else { FUNDS_CASH };
    txn.starting_actions.push(StartingAction {
        direction: Some(direction.to_string()),
        type_of_funds: Some(
            present(raw.str_sa_funds_type.as_ref())
                .unwrap_or(default_funds)
                .to_string(),
        ),
        amount: sa_amount,
        currency: first_currency(&[raw.str_sa_currency.as_ref(), currency_fallback]),
        account: book.descriptor(
            sa_account,
            raw.str_sa_fi_number.as_ref(),
            raw.str_sa_branch.as_ref(),
        ),
        account_holders: resolved.references(&sa_holders),
        conductors: vec![resolved.reference(conductor)],
    });

    let completing = if withdrawal {
        CompletingAction {
            account: AccountDescriptor::default(),
            account_holders: Vec::new(),
            beneficiaries: vec![resolved.reference(conductor)],
            ..Default::default()
        }
    } else {
        CompletingAction {
            account: book.descriptor(
                deposit_account,
                raw.str_ca_fi_number.as_ref().or(raw.str_sa_fi_number.as_ref()),
                raw.str_ca_branch.as_ref().or(raw.str_sa_branch.as_ref()),
            ),
            account_holders: resolved.references(&ca_holders),
            beneficiaries: resolved.references(&ca_holders),
            ..Default::default()
        }
    };

    txn.completing_actions.push(CompletingAction {
        details_of_disposition: Some(disposition.to_string()),
        amount: ca_amount,
        currency: first_currency(&[
            raw.str_ca_currency.as_ref(),
            raw.str_sa_currency.as_ref(),
            currency_fallback,
        ]),
        ..completing
    });

    Ok(finish(txn, resolved, warnings))
}
