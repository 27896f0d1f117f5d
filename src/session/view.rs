//! Materialized, display-ready view of a case.
//!
//! The view is a pure function of the case record. `partial_recompute` takes
//! the previous view as an argument and replays only the rows of edited
//! transactions; every other row is reused, with its party names refreshed.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::changelog::current_state;
use crate::domain::case::{CaseRecord, CaseTransaction};
use crate::domain::party::Party;
use crate::domain::transaction::StrTransaction;

/// One display row: the replayed transaction with party names inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrTransactionData {
    #[serde(flatten)]
    pub transaction: StrTransaction,
    /// Version of the newest change-log entry, if the transaction was edited.
    pub change_log_version: Option<u64>,
    /// Display name per referenced `partyIdentifier`.
    pub party_names: BTreeMap<String, String>,
    /// Set when the change log could not be replayed; the row then shows the base.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_error: Option<String>,
}

impl StrTransactionData {
    pub fn id(&self) -> &str {
        self.transaction.id()
    }
}

pub type MaterializedView = Vec<Arc<StrTransactionData>>;

fn party_names(transaction: &StrTransaction, parties: &[Party]) -> BTreeMap<String, String> {
    transaction
        .referenced_parties()
        .into_iter()
        .filter_map(|id| {
            parties
                .iter()
                .find(|party| party.party_identifier == id)
                .and_then(Party::display_name)
                .map(|name| (id.to_string(), name))
        })
        .collect()
}

/// Display form of one stored transaction.
pub fn display_transaction(txn: &CaseTransaction, parties: &[Party]) -> StrTransactionData {
    let (transaction, replay_error) = match current_state(txn) {
        Ok(replayed) => (replayed, None),
        Err(e) => {
            tracing::warn!("Could not replay change log of {}: {}", txn.id(), e);
            (txn.base.clone(), Some(e.to_string()))
        }
    };

    let party_names = party_names(&transaction, parties);

    StrTransactionData {
        change_log_version: txn.last_version(),
        party_names,
        replay_error,
        transaction,
    }
}

/// Rebuilds every row from scratch.
pub fn full_recompute(case: &CaseRecord) -> MaterializedView {
    case.transactions
        .iter()
        .map(|txn| Arc::new(display_transaction(txn, &case.parties)))
        .collect()
}

/// Rebuilds only the rows in `edited_ids`, reusing the rest of `previous`.
///
/// Rows follow the case's transaction order. A transaction with no previous
/// row is built fresh. A reused row whose party names changed, e.g. because
/// a referenced party was only now added to the case, gets the new names.
pub fn partial_recompute(
    previous: &[Arc<StrTransactionData>],
    edited_ids: &[String],
    case: &CaseRecord,
) -> MaterializedView {
    let edited: HashSet<&str> = edited_ids.iter().map(String::as_str).collect();
    let reusable: HashMap<&str, &Arc<StrTransactionData>> =
        previous.iter().map(|row| (row.id(), row)).collect();

    case.transactions
        .iter()
        .map(|txn| match reusable.get(txn.id()) {
            Some(row) if !edited.contains(txn.id()) => {
                let names = party_names(&row.transaction, &case.parties);
                if names == row.party_names {
                    Arc::clone(row)
                } else {
                    Arc::new(StrTransactionData {
                        party_names: names,
                        ..(***row).clone()
                    })
                }
            }
            _ => Arc::new(display_transaction(txn, &case.parties)),
        })
        .collect()
}

/// Partial recompute when the case records which transactions were just
/// edited, full recompute otherwise.
pub fn recompute(previous: &[Arc<StrTransactionData>], case: &CaseRecord) -> MaterializedView {
    match &case.last_edited_transaction_ids {
        Some(edited) => partial_recompute(previous, edited, case),
        None => full_recompute(case),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::ChangeLogEntry;
    use crate::domain::party::{PartyName, PartyRef};
    use crate::domain::transaction::StartingAction;
    use serde_json::json;

    fn case_with(ids: &[&str]) -> CaseRecord {
        let mut case = CaseRecord::empty("AML-1");
        case.parties.push(Party {
            party_identifier: "p1".to_string(),
            discriminator_key: None,
            identifiers: None,
            name: Some(PartyName::entity("Maple Holdings")),
            account: None,
            contact: None,
            address: None,
        });
        for id in ids {
            case.transactions.push(CaseTransaction::new(StrTransaction {
                flow_of_funds_aml_transaction_id: id.to_string(),
                method_of_transaction: Some("ABM".to_string()),
                starting_actions: vec![StartingAction {
                    conductors: vec![PartyRef::new("p1")],
                    ..Default::default()
                }],
                ..Default::default()
            }));
        }
        case
    }

    fn edit(case: &mut CaseRecord, id: &str, version: u64) {
        let txn = case
            .transactions
            .iter_mut()
            .find(|t| t.id() == id)
            .unwrap();
        txn.change_logs.push(ChangeLogEntry {
            field: "methodOfTransaction".to_string(),
            previous_value: json!("ABM"),
            new_value: json!("Other"),
            version,
        });
    }

    #[test]
    fn test_display_inlines_party_names() {
        let case = case_with(&["T1"]);
        let row = display_transaction(&case.transactions[0], &case.parties);

        assert_eq!(row.party_names.get("p1").map(String::as_str), Some("Maple Holdings"));
        assert_eq!(row.change_log_version, None);
    }

    #[test]
    fn test_partial_reuses_untouched_rows() {
        let mut case = case_with(&["T1", "T2", "T3"]);
        let before = full_recompute(&case);

        edit(&mut case, "T2", 1);
        let after = partial_recompute(&before, &["T2".to_string()], &case);

        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert!(!Arc::ptr_eq(&before[1], &after[1]));
        assert!(Arc::ptr_eq(&before[2], &after[2]));
        assert_eq!(after[1].transaction.method_of_transaction.as_deref(), Some("Other"));
        assert_eq!(after, full_recompute(&case));
    }

    #[test]
    fn test_partial_with_all_ids_equals_full() {
        let mut case = case_with(&["T1", "T2"]);
        let before = full_recompute(&case);
        edit(&mut case, "T1", 1);
        edit(&mut case, "T2", 1);

        let all = case.transaction_ids();
        assert_eq!(partial_recompute(&before, &all, &case), full_recompute(&case));
    }

    #[test]
    fn test_new_transactions_get_rows() {
        let case = case_with(&["T1"]);
        let before = full_recompute(&case);

        let grown = case_with(&["T1", "T9"]);
        let after = partial_recompute(&before, &[], &grown);
        assert_eq!(after.len(), 2);
        assert_eq!(after[1].id(), "T9");
    }

    #[test]
    fn test_reused_row_picks_up_newly_added_party() {
        let mut case = case_with(&["T1"]);
        case.transactions[0].base.starting_actions[0]
            .conductors
            .push(PartyRef::new("p2"));
        let before = full_recompute(&case);
        assert!(before[0].party_names.get("p2").is_none());

        case.parties.push(Party {
            party_identifier: "p2".to_string(),
            discriminator_key: None,
            identifiers: None,
            name: Some(PartyName::entity("Dépanneur Roy")),
            account: None,
            contact: None,
            address: None,
        });
        let after = partial_recompute(&before, &[], &case);

        assert_eq!(
            after[0].party_names.get("p2").map(String::as_str),
            Some("Dépanneur Roy")
        );
        assert_eq!(after, full_recompute(&case));
    }

    #[test]
    fn test_recompute_dispatch() {
        let mut case = case_with(&["T1", "T2"]);
        let before = full_recompute(&case);

        edit(&mut case, "T1", 1);
        case.last_edited_transaction_ids = Some(vec!["T1".to_string()]);
        let partial = recompute(&before, &case);
        assert!(Arc::ptr_eq(&before[1], &partial[1]));

        case.last_edited_transaction_ids = None;
        let full = recompute(&before, &case);
        assert!(!Arc::ptr_eq(&before[1], &full[1]));
        assert_eq!(partial, full);
    }

    #[test]
    fn test_bad_change_log_falls_back_to_base() {
        let mut case = case_with(&["T1"]);
        case.transactions[0].change_logs.push(ChangeLogEntry {
            field: "startingActions.9.amount".to_string(),
            previous_value: json!(null),
            new_value: json!("1"),
            version: 1,
        });

        let row = display_transaction(&case.transactions[0], &case.parties);
        assert!(row.replay_error.is_some());
        assert_eq!(row.transaction, case.transactions[0].base);
    }
}
