//! Steps shared by every source normalizer: account fetch, party collection,
//! concurrent identity resolution and metadata stamping.

use bigdecimal::{BigDecimal, Zero};
use futures::future::join_all;
use std::collections::HashMap;

use super::{LookupWarning, NormalizedTransaction};
use crate::domain::party::{Party, PartyDescription, PartyRef};
use crate::domain::source::{FlowOfFundsEnvelope, SourceSystem};
use crate::domain::transaction::{AccountDescriptor, StrTransaction, DISPOSITION_CASH_WITHDRAWAL};
use crate::error::{LookupError, NormalizeError};
use crate::identity::IdentityResolver;
use crate::ports::{AccountInfo, AccountLookup};
use crate::utils::sanitize::mask_identifier;

/// Collaborators borrowed by one normalization.
#[derive(Clone, Copy)]
pub(crate) struct Collaborators<'a> {
    pub accounts: &'a dyn AccountLookup,
    pub identity: &'a IdentityResolver,
}

/// Account information fetched for one record, keyed by trimmed account number.
#[derive(Debug, Default)]
pub(crate) struct AccountBook {
    accounts: HashMap<String, AccountInfo>,
}

impl AccountBook {
    pub fn get(&self, account: &str) -> Option<&AccountInfo> {
        self.accounts.get(account.trim())
    }

    pub fn holder_keys(&self, account: Option<&str>) -> Vec<String> {
        account
            .and_then(|number| self.get(number))
            .map(AccountInfo::holder_keys)
            .unwrap_or_default()
    }

    /// Every holder key of every fetched account, in a stable order.
    pub fn all_holder_keys(&self) -> Vec<String> {
        let mut numbers: Vec<&String> = self.accounts.keys().collect();
        numbers.sort();
        numbers
            .into_iter()
            .filter_map(|number| self.accounts.get(number))
            .flat_map(AccountInfo::holder_keys)
            .collect()
    }

    /// Account descriptor for `account`, falling back to the bare number when
    /// the lookup had nothing. Record-level FI and branch values win.
    pub fn descriptor(
        &self,
        account: Option<&str>,
        fi_number: Option<&String>,
        branch: Option<&String>,
    ) -> AccountDescriptor {
        let Some(number) = account.map(str::trim).filter(|n| !n.is_empty()) else {
            return AccountDescriptor {
                fi_number: fi_number.cloned(),
                branch: branch.cloned(),
                ..Default::default()
            };
        };

        let mut descriptor = match self.get(number) {
            Some(info) => info.descriptor(),
            None => AccountDescriptor {
                account: Some(number.to_string()),
                ..Default::default()
            },
        };
        if let Some(fi) = fi_number {
            descriptor.fi_number = Some(fi.clone());
        }
        if let Some(branch) = branch {
            descriptor.branch = Some(branch.clone());
        }
        descriptor
    }
}

/// Fetches every distinct account concurrently.
///
/// All fetches settle before returning. Not-found answers become warnings;
/// the first transport class failure is returned.
pub(crate) async fn fetch_accounts(
    lookup: &dyn AccountLookup,
    accounts: &[Option<&str>],
    warnings: &mut Vec<LookupWarning>,
) -> Result<AccountBook, LookupError> {
    let mut distinct: Vec<String> = Vec::new();
    for number in accounts.iter().flatten() {
        let number = number.trim();
        if !number.is_empty() && !distinct.iter().any(|known| known == number) {
            distinct.push(number.to_string());
        }
    }

    let results = join_all(
        distinct
            .iter()
            .map(|number| lookup.get_account_info(number)),
    )
    .await;

    let mut book = AccountBook::default();
    let mut failure = None;

    for (number, result) in distinct.into_iter().zip(results) {
        match result {
            Ok(info) => {
                book.accounts.insert(number, info);
            }
            Err(LookupError::NotFound(_)) => {
                tracing::warn!("Account {} not found in account lookup", mask_identifier(&number));
                warnings.push(LookupWarning::AccountNotFound { account: number });
            }
            Err(e) => {
                tracing::error!("Account lookup failed for {}: {}", mask_identifier(&number), e);
                failure.get_or_insert(e);
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(book),
    }
}

/// Handle to a collected party, valid for the collector that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot(usize);

/// Collects party descriptions for one record. Keyed descriptions are
/// de-duplicated by trimmed party key.
#[derive(Debug, Default)]
pub(crate) struct PartyCollector {
    slots: Vec<PartyDescription>,
    by_key: HashMap<String, usize>,
}

impl PartyCollector {
    pub fn key(&mut self, party_key: &str) -> Slot {
        self.description(PartyDescription::from_party_key(party_key.trim()))
    }

    pub fn keys(&mut self, party_keys: &[String]) -> Vec<Slot> {
        party_keys.iter().map(|key| self.key(key)).collect()
    }

    pub fn description(&mut self, description: PartyDescription) -> Slot {
        if let Some(key) = description.party_key().map(str::to_string) {
            if let Some(&index) = self.by_key.get(&key) {
                merge_local_fields(&mut self.slots[index], description);
                return Slot(index);
            }
            self.by_key.insert(key, self.slots.len());
        }
        self.slots.push(description);
        Slot(self.slots.len() - 1)
    }

    /// Resolves every collected description concurrently.
    pub async fn resolve(
        self,
        identity: &IdentityResolver,
        warnings: &mut Vec<LookupWarning>,
    ) -> Result<ResolvedParties, LookupError> {
        let results = join_all(
            self.slots
                .into_iter()
                .map(|description| identity.resolve_detailed(description)),
        )
        .await;

        let mut parties = Vec::with_capacity(results.len());
        let mut failure = None;

        for result in results {
            match result {
                Ok(resolution) => {
                    if let Some(party_key) = resolution.not_found_key {
                        warnings.push(LookupWarning::PartyNotFound { party_key });
                    }
                    parties.push(resolution.party);
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(ResolvedParties { parties }),
        }
    }
}

/// Fills fields of `target` that are empty from `extra`.
fn merge_local_fields(target: &mut PartyDescription, extra: PartyDescription) {
    if target.name.is_none() {
        target.name = extra.name;
    }
    if target.account.is_none() {
        target.account = extra.account;
    }
    if target.contact.is_none() {
        target.contact = extra.contact;
    }
    if target.address.is_none() {
        target.address = extra.address;
    }
}

pub(crate) struct ResolvedParties {
    parties: Vec<Party>,
}

impl ResolvedParties {
    pub fn reference(&self, slot: Slot) -> PartyRef {
        self.parties[slot.0].to_ref()
    }

    pub fn references(&self, slots: &[Slot]) -> Vec<PartyRef> {
        slots.iter().map(|slot| self.reference(*slot)).collect()
    }

    /// Resolved parties, distinct by identifier, in collection order.
    pub fn into_distinct(self) -> Vec<Party> {
        let mut distinct: Vec<Party> = Vec::with_capacity(self.parties.len());
        for party in self.parties {
            if !distinct
                .iter()
                .any(|known| known.party_identifier == party.party_identifier)
            {
                distinct.push(party);
            }
        }
        distinct
    }
}

/// Transaction shell stamped from the flow-of-funds envelope.
pub(crate) fn stamp_envelope(
    envelope: &FlowOfFundsEnvelope,
    source: SourceSystem,
    method: &str,
) -> Result<StrTransaction, NormalizeError> {
    let id = envelope.flow_of_funds_aml_transaction_id.trim();
    if id.is_empty() {
        return Err(NormalizeError::MissingField("flowOfFundsAmlTransactionId"));
    }

    let mut txn = StrTransaction {
        flow_of_funds_aml_transaction_id: id.to_string(),
        date_of_transaction: envelope.flow_of_funds_transaction_date,
        time_of_transaction: envelope.flow_of_funds_transaction_time,
        date_of_posting: envelope.flow_of_funds_posting_date,
        time_of_posting: envelope.flow_of_funds_posting_time,
        method_of_transaction: Some(method.to_string()),
        reporting_entity_txn_ref_no: envelope.flow_of_funds_source_transaction_id.clone(),
        reporting_entity_location_no: envelope.reporting_entity_location_no.clone(),
        description_of_transaction: envelope.flow_of_funds_transaction_desc.clone(),
        ..Default::default()
    };

    let summary = &mut txn.flow_of_funds;
    summary.flow_of_funds_credited_account = envelope.flow_of_funds_credited_account.clone();
    summary.flow_of_funds_credited_transit = envelope.flow_of_funds_credited_transit.clone();
    summary.flow_of_funds_credit_amount = envelope.flow_of_funds_credit_amount.clone();
    summary.flow_of_funds_debited_account = envelope.flow_of_funds_debited_account.clone();
    summary.flow_of_funds_debited_transit = envelope.flow_of_funds_debited_transit.clone();
    summary.flow_of_funds_debit_amount = envelope.flow_of_funds_debit_amount.clone();
    summary.flow_of_funds_transaction_currency =
        envelope.flow_of_funds_transaction_currency.clone();
    summary.flow_of_funds_transaction_currency_amount =
        envelope.flow_of_funds_transaction_currency_amount.clone();
    summary.flow_of_funds_source = Some(source.as_str().to_string());
    summary.flow_of_funds_source_transaction_id =
        envelope.flow_of_funds_source_transaction_id.clone();
    summary.flow_of_funds_transaction_desc = envelope.flow_of_funds_transaction_desc.clone();

    Ok(txn)
}

pub(crate) fn finish(
    transaction: StrTransaction,
    parties: ResolvedParties,
    warnings: Vec<LookupWarning>,
) -> NormalizedTransaction {
    tracing::debug!(
        "Normalized transaction {} with {} starting and {} completing actions",
        transaction.flow_of_funds_aml_transaction_id,
        transaction.starting_actions.len(),
        transaction.completing_actions.len()
    );

    NormalizedTransaction {
        transaction,
        parties: parties.into_distinct(),
        warnings,
    }
}

/// First present amount, rejecting negatives.
pub(crate) fn non_negative(
    field: &'static str,
    candidates: &[Option<&BigDecimal>],
) -> Result<Option<BigDecimal>, NormalizeError> {
    match candidates.iter().flatten().next() {
        Some(amount) if *amount < &BigDecimal::zero() => Err(NormalizeError::InvalidAmount {
            field,
            value: amount.to_string(),
        }),
        Some(amount) => Ok(Some((*amount).clone())),
        None => Ok(None),
    }
}

/// Required text field, trimmed.
pub(crate) fn required<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, NormalizeError> {
    let value = value.trim();
    if value.is_empty() {
        Err(NormalizeError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Non-blank optional text, trimmed.
pub(crate) fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

pub(crate) fn first_currency(candidates: &[Option<&String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

pub(crate) fn is_cash_withdrawal(disposition: &str) -> bool {
    disposition.trim().eq_ignore_ascii_case(DISPOSITION_CASH_WITHDRAWAL)
}
