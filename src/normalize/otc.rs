use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

use super::names::parse_party_name;
use super::shared::{
    fetch_accounts, finish, first_currency, is_cash_withdrawal, non_negative, present, required,
    stamp_envelope, Collaborators, PartyCollector,
};
use super::NormalizedTransaction;
use crate::domain::party::{PartyDescription, PartyIdentifiers};
use crate::domain::source::{FlowOfFundsEnvelope, OtcSourceRecord, SourceSystem};
use crate::domain::transaction::{
    AccountDescriptor, CompletingAction, StartingAction, FUNDS_CASH, FUNDS_CHEQUE,
    METHOD_IN_PERSON,
};
use crate::error::NormalizeError;

static FUNDS_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(cheques?|cash)\b").expect("hardcoded regex should be valid")
});

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$?([0-9][0-9,]*(?:\.[0-9]{1,2})?)").expect("hardcoded regex should be valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FundsKeyword {
    Cheque,
    Cash,
}

/// Characters between two non-overlapping spans.
fn gap(a: (usize, usize), b: (usize, usize)) -> usize {
    if a.1 <= b.0 {
        b.0 - a.1
    } else {
        a.0.saturating_sub(b.1)
    }
}

/// Cheque sub-amount of a mixed cheque and cash amount description, e.g.
/// `"Cheque $6,000.00 + cash $4,800.00"` or `"$6,000.00 cheque, $4,800.00 cash"`.
///
/// Each amount belongs to the keyword nearest to it on either side. `None`
/// unless both kinds are named and exactly one amount belongs to a cheque.
pub fn parse_cheque_amount(description: &str) -> Option<BigDecimal> {
    let keywords: Vec<(FundsKeyword, (usize, usize))> = FUNDS_KEYWORD
        .find_iter(description)
        .map(|m| {
            let kind = if m.as_str().to_lowercase().starts_with("cash") {
                FundsKeyword::Cash
            } else {
                FundsKeyword::Cheque
            };
            (kind, (m.start(), m.end()))
        })
        .collect();
    if !keywords.iter().any(|(kind, _)| *kind == FundsKeyword::Cash)
        || !keywords.iter().any(|(kind, _)| *kind == FundsKeyword::Cheque)
    {
        return None;
    }

    let mut cheque_amounts = Vec::new();
    for captures in AMOUNT.captures_iter(description) {
        let (Some(whole), Some(digits)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let span = (whole.start(), whole.end());
        let nearest_cheque = keywords
            .iter()
            .filter(|(kind, _)| *kind == FundsKeyword::Cheque)
            .map(|(_, kw)| gap(span, *kw))
            .min();
        let nearest_cash = keywords
            .iter()
            .filter(|(kind, _)| *kind == FundsKeyword::Cash)
            .map(|(_, kw)| gap(span, *kw))
            .min();
        match (nearest_cheque, nearest_cash) {
            (Some(cheque), Some(cash)) if cheque < cash => {
                cheque_amounts.push(digits.as_str().replace(',', ""));
            }
            (Some(cheque), Some(cash)) if cheque == cash => {
                tracing::warn!(
                    "Amount {} is equally close to cheque and cash, not splitting",
                    digits.as_str()
                );
                return None;
            }
            _ => {}
        }
    }

    match cheque_amounts.as_slice() {
        [digits] => BigDecimal::from_str(digits).ok(),
        [] => None,
        _ => {
            tracing::warn!(
                "Description names {} cheque amounts, not splitting",
                cheque_amounts.len()
            );
            None
        }
    }
}

/// Split of a mixed deposit into its cheque and cash legs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MixedDeposit {
    cheque: BigDecimal,
    cash: BigDecimal,
}

fn split_mixed_deposit(
    description: Option<&str>,
    credit_amount: Option<&BigDecimal>,
) -> Option<MixedDeposit> {
    let cheque = parse_cheque_amount(description?)?;
    let credit = credit_amount?;
    if &cheque > credit {
        tracing::warn!(
            "Cheque amount {} exceeds credited amount {}, not splitting",
            cheque,
            credit
        );
        return None;
    }
    Some(MixedDeposit {
        cash: credit - &cheque,
        cheque,
    })
}

/// OTC in-person transactions. A mixed cheque and cash deposit becomes two
/// starting actions sharing one conductor list.
pub(crate) async fn normalize(
    ctx: Collaborators<'_>,
    raw: &OtcSourceRecord,
    envelope: &FlowOfFundsEnvelope,
) -> Result<NormalizedTransaction, NormalizeError> {
    let mut txn = stamp_envelope(envelope, SourceSystem::Otc, METHOD_IN_PERSON)?;
    let direction = required("strSaDirection", &raw.str_sa_direction)?;
    let disposition = required("strCaDispositionType", &raw.str_ca_disposition_type)?;
    let withdrawal = is_cash_withdrawal(disposition);

    let sa_account = present(raw.str_sa_account.as_ref());
    let ca_account = present(raw.str_ca_account.as_ref());

    let mut warnings = Vec::new();
    let book = fetch_accounts(ctx.accounts, &[sa_account, ca_account], &mut warnings).await?;

    let sa_holder_keys = book.holder_keys(sa_account);
    let ca_holder_keys = book.holder_keys(ca_account);

    let mut parties = PartyCollector::default();
    let sa_holders = parties.keys(&sa_holder_keys);
    let ca_holders = parties.keys(&ca_holder_keys);
    parties.keys(&book.all_holder_keys());

    let conductor_name = present(raw.str_conductor_name.as_ref()).and_then(parse_party_name);
    let conductor = match present(raw.str_conductor_party_key.as_ref()) {
        Some(key) => parties.description(PartyDescription {
            identifiers: Some(PartyIdentifiers::with_party_key(key)),
            name: conductor_name,
            ..Default::default()
        }),
        None => match (conductor_name, sa_holders.first().or(ca_holders.first())) {
            (Some(name), _) => parties.description(PartyDescription {
                name: Some(name),
                ..Default::default()
            }),
            (None, Some(holder)) => *holder,
            (None, None) => parties.description(PartyDescription::default()),
        },
    };

    let resolved = parties.resolve(ctx.identity, &mut warnings).await?;

    let credit_amount = non_negative(
        "flowOfFundsCreditAmount",
        &[
            envelope.flow_of_funds_credit_amount.as_ref(),
            raw.str_ca_amount.as_ref(),
            raw.str_sa_amount.as_ref(),
        ],
    )?;
    let currency = first_currency(&[
        raw.str_sa_currency.as_ref(),
        raw.str_ca_currency.as_ref(),
        envelope.flow_of_funds_transaction_currency.as_ref(),
    ]);

    let sa_descriptor = book.descriptor(sa_account, None, None);
    let conductors = vec![resolved.reference(conductor)];
    let starting = |type_of_funds: &str, amount: Option<BigDecimal>| StartingAction {
        direction: Some(direction.to_string()),
        type_of_funds: Some(type_of_funds.to_string()),
        amount,
        currency: currency.clone(),
        account: sa_descriptor.clone(),
        account_holders: resolved.references(&sa_holders),
        conductors: conductors.clone(),
    };

    let description = present(raw.str_sa_amount_description.as_ref());
    match split_mixed_deposit(description, credit_amount.as_ref()) {
        Some(split) => {
            txn.starting_actions
                .push(starting(FUNDS_CHEQUE, Some(split.cheque)));
            if split.cash > BigDecimal::zero() {
                txn.starting_actions.push(starting(FUNDS_CASH, Some(split.cash)));
            }
        }
        None => {
            let amount = non_negative(
                "strSaAmount",
                &[raw.str_sa_amount.as_ref(), credit_amount.as_ref()],
            )?;
            let funds = present(raw.str_sa_funds_type.as_ref()).unwrap_or(FUNDS_CASH);
            txn.starting_actions.push(starting(funds, amount));
        }
    }

    let ca_amount = non_negative(
        "strCaAmount",
        &[raw.str_ca_amount.as_ref(), credit_amount.as_ref()],
    )?;
    let (account, account_holders, beneficiaries) = if withdrawal {
        (AccountDescriptor::default(), Vec::new(), conductors.clone())
    } else {
        (
            book.descriptor(
                ca_account,
                raw.str_ca_fi_number.as_ref(),
                raw.str_ca_branch.as_ref(),
            ),
            resolved.references(&ca_holders),
            resolved.references(&ca_holders),
        )
    };

    txn.completing_actions.push(CompletingAction {
        details_of_disposition: Some(disposition.to_string()),
        amount: ca_amount,
        currency: first_currency(&[
            raw.str_ca_currency.as_ref(),
            raw.str_sa_currency.as_ref(),
            envelope.flow_of_funds_transaction_currency.as_ref(),
        ]),
        account,
        account_holders,
        beneficiaries,
    });

    Ok(finish(txn, resolved, warnings))
}
