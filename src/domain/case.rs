//! Case domain entities: the versioned working document of one review session.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::party::Party;
use crate::domain::transaction::StrTransaction;

/// One versioned field-level edit applied to a base transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    /// Dotted field path, e.g. `startingActions.0.amount`.
    pub field: String,
    #[serde(default)]
    pub previous_value: Value,
    #[serde(default)]
    pub new_value: Value,
    pub version: u64,
}

/// A stored transaction: the immutable base plus its append-only change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseTransaction {
    #[serde(flatten)]
    pub base: StrTransaction,
    #[serde(default)]
    pub change_logs: Vec<ChangeLogEntry>,
}

impl CaseTransaction {
    pub fn new(base: StrTransaction) -> Self {
        Self {
            base,
            change_logs: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn last_version(&self) -> Option<u64> {
        self.change_logs.last().map(|entry| entry.version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    #[serde(default)]
    pub party_keys: Vec<String>,
    #[serde(default)]
    pub account_numbers: Vec<String>,
    #[serde(default)]
    pub source_systems: Vec<String>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

/// The versioned case document owned by the session state manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub version: u64,
    pub aml_id: String,
    #[serde(default)]
    pub search_parameters: SearchParameters,
    #[serde(default)]
    pub transactions: Vec<CaseTransaction>,
    /// Materialized party list; every `partyIdentifier` referenced by a
    /// transaction should appear here.
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub last_edited_transaction_ids: Option<Vec<String>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CaseRecord {
    /// A fresh, never-saved case.
    pub fn empty(aml_id: impl Into<String>) -> Self {
        Self {
            version: 0,
            aml_id: aml_id.into(),
            search_parameters: SearchParameters::default(),
            transactions: Vec::new(),
            parties: Vec::new(),
            last_edited_transaction_ids: None,
            last_updated: None,
        }
    }

    pub fn transaction(&self, id: &str) -> Option<&CaseTransaction> {
        self.transactions.iter().find(|txn| txn.id() == id)
    }

    pub fn party(&self, party_identifier: &str) -> Option<&Party> {
        self.parties
            .iter()
            .find(|party| party.party_identifier == party_identifier)
    }

    pub fn transaction_ids(&self) -> Vec<String> {
        self.transactions
            .iter()
            .map(|txn| txn.id().to_string())
            .collect()
    }
}

/// Body of `GET /cases/{amlId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSnapshot {
    pub version: u64,
    #[serde(default)]
    pub search_params: SearchParameters,
    #[serde(default)]
    pub transactions: Vec<CaseTransaction>,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CaseSnapshot {
    pub fn into_record(self, aml_id: impl Into<String>) -> CaseRecord {
        CaseRecord {
            version: self.version,
            aml_id: aml_id.into(),
            search_parameters: self.search_params,
            transactions: self.transactions,
            parties: self.parties,
            last_edited_transaction_ids: None,
            last_updated: self.last_updated,
        }
    }
}

/// Body of `PUT /cases/{amlId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCaseRequest {
    pub base_version: u64,
    pub transactions: Vec<CaseTransaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parties: Vec<Party>,
}

/// Successful response of `PUT /cases/{amlId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCaseResponse {
    pub new_version: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_transaction_wire_shape() {
        let value = json!({
            "flowOfFundsAmlTransactionId": "T1",
            "methodOfTransaction": "ABM",
            "startingActions": [],
            "completingActions": [],
            "changeLogs": [
                { "field": "methodOfTransaction", "previousValue": "ABM", "newValue": "Other", "version": 3 }
            ]
        });

        let txn: CaseTransaction = serde_json::from_value(value).unwrap();
        assert_eq!(txn.id(), "T1");
        assert_eq!(txn.last_version(), Some(3));
        assert_eq!(txn.base.method_of_transaction.as_deref(), Some("ABM"));
    }

    #[test]
    fn test_snapshot_into_record() {
        let snapshot: CaseSnapshot = serde_json::from_value(json!({
            "version": 7,
            "searchParams": { "partyKeys": ["P1"] },
            "transactions": []
        }))
        .unwrap();

        let record = snapshot.into_record("AML-1");
        assert_eq!(record.version, 7);
        assert_eq!(record.aml_id, "AML-1");
        assert_eq!(record.search_parameters.party_keys, vec!["P1".to_string()]);
        assert!(record.last_edited_transaction_ids.is_none());
    }

    #[test]
    fn test_empty_case_starts_at_version_zero() {
        let record = CaseRecord::empty("AML-2");
        assert_eq!(record.version, 0);
        assert!(record.transactions.is_empty());
    }
}
