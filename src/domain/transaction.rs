//! Canonical transaction domain entity.
//! Framework-agnostic representation of one reportable transaction: metadata,
//! debit-side starting actions, credit-side completing actions and the
//! flow-of-funds summary it was assembled from.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::party::PartyRef;
use crate::validation::ValidationError;

pub const DIRECTION_IN: &str = "In";
pub const DIRECTION_OUT: &str = "Out";

pub const FUNDS_CASH: &str = "Cash";
pub const FUNDS_CHEQUE: &str = "Cheque";
pub const FUNDS_WITHDRAWAL: &str = "Funds withdrawal";
pub const FUNDS_EMAIL_TRANSFER: &str = "Email money transfer";
pub const FUNDS_INTERNATIONAL_TRANSFER: &str = "International funds transfer";
pub const FUNDS_DEBIT_CARD: &str = "Debit card";

pub const DISPOSITION_DEPOSIT: &str = "Deposit to account";
pub const DISPOSITION_CASH_WITHDRAWAL: &str = "Cash withdrawal";
pub const DISPOSITION_OUTGOING_EMAIL_TRANSFER: &str = "Outgoing email money transfer";
pub const DISPOSITION_PURCHASE: &str = "Purchase of products/services";

pub const METHOD_ABM: &str = "ABM";
pub const METHOD_IN_PERSON: &str = "In-Person";
pub const METHOD_ONLINE: &str = "Online";
pub const METHOD_OTHER: &str = "Other";

/// Account descriptors shared by starting and completing actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fi_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_open: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_close: Option<NaiveDate>,
}

/// Debit-side leg of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_funds: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub account: AccountDescriptor,
    #[serde(default)]
    pub account_holders: Vec<PartyRef>,
    #[serde(default)]
    pub conductors: Vec<PartyRef>,
}

/// Credit-side leg of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletingAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_of_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub account: AccountDescriptor,
    #[serde(default)]
    pub account_holders: Vec<PartyRef>,
    #[serde(default)]
    pub beneficiaries: Vec<PartyRef>,
}

/// Flow-of-funds summary copied from the source envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowOfFundsSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_credited_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_credited_transit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_credit_amount: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_debited_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_debited_transit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_debit_amount: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_transaction_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_transaction_currency_amount: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_source_transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_of_funds_transaction_desc: Option<String>,
}

/// Canonical transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrTransaction {
    pub flow_of_funds_aml_transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_transaction: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_transaction: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_posting: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_posting: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_of_transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_entity_txn_ref_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_entity_location_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_of_transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_of_transaction: Option<String>,
    #[serde(default)]
    pub starting_actions: Vec<StartingAction>,
    #[serde(default)]
    pub completing_actions: Vec<CompletingAction>,
    #[serde(flatten)]
    pub flow_of_funds: FlowOfFundsSummary,
    /// Domain-option violations found while the transaction was built by hand.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,
}

impl StrTransaction {
    pub fn id(&self) -> &str {
        &self.flow_of_funds_aml_transaction_id
    }

    /// Sum of starting action amounts. Missing amounts count as zero.
    pub fn total_debited(&self) -> BigDecimal {
        self.starting_actions
            .iter()
            .filter_map(|sa| sa.amount.clone())
            .fold(BigDecimal::from(0), |acc, x| acc + x)
    }

    /// Sum of completing action amounts. Missing amounts count as zero.
    pub fn total_credited(&self) -> BigDecimal {
        self.completing_actions
            .iter()
            .filter_map(|ca| ca.amount.clone())
            .fold(BigDecimal::from(0), |acc, x| acc + x)
    }

    /// Every party identifier referenced by any action, in first-seen order.
    pub fn referenced_parties(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let refs = self
            .starting_actions
            .iter()
            .flat_map(|sa| sa.account_holders.iter().chain(sa.conductors.iter()))
            .chain(
                self.completing_actions
                    .iter()
                    .flat_map(|ca| ca.account_holders.iter().chain(ca.beneficiaries.iter())),
            );

        for party in refs {
            if !seen.contains(&party.party_identifier.as_str()) {
                seen.push(&party.party_identifier);
            }
        }

        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amount(value: &str) -> Option<BigDecimal> {
        Some(BigDecimal::from_str(value).unwrap())
    }

    #[test]
    fn test_totals() {
        let txn = StrTransaction {
            flow_of_funds_aml_transaction_id: "T1".to_string(),
            starting_actions: vec![
                StartingAction {
                    amount: amount("6000.00"),
                    ..Default::default()
                },
                StartingAction {
                    amount: amount("4800.00"),
                    ..Default::default()
                },
            ],
            completing_actions: vec![CompletingAction {
                amount: amount("10800.00"),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(txn.total_debited(), txn.total_credited());
    }

    #[test]
    fn test_referenced_parties_are_distinct() {
        let txn = StrTransaction {
            flow_of_funds_aml_transaction_id: "T1".to_string(),
            starting_actions: vec![StartingAction {
                account_holders: vec![PartyRef::new("a")],
                conductors: vec![PartyRef::new("a")],
                ..Default::default()
            }],
            completing_actions: vec![CompletingAction {
                beneficiaries: vec![PartyRef::new("b"), PartyRef::new("a")],
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(txn.referenced_parties(), vec!["a", "b"]);
    }

    #[test]
    fn test_serializes_flattened_camel_case() {
        let txn = StrTransaction {
            flow_of_funds_aml_transaction_id: "T1".to_string(),
            starting_actions: vec![StartingAction {
                amount: amount("12.50"),
                account: AccountDescriptor {
                    account: Some("ACC1".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }],
            flow_of_funds: FlowOfFundsSummary {
                flow_of_funds_source: Some("ABM".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let value = serde_json::to_value(&txn).unwrap();
        assert_eq!(value["flowOfFundsAmlTransactionId"], "T1");
        assert_eq!(value["startingActions"][0]["account"], "ACC1");
        assert_eq!(value["startingActions"][0]["amount"], "12.50");
        assert_eq!(value["flowOfFundsSource"], "ABM");
        assert!(value.get("validationErrors").is_none());

        let back: StrTransaction = serde_json::from_value(value).unwrap();
        assert_eq!(back, txn);
    }
}
