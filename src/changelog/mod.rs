//! Change-log engine.
//!
//! Edits are never written into a base transaction. Each edit is a versioned
//! `ChangeLogEntry`, and the displayed form of a transaction is the base with
//! its log replayed in ascending version order. Entries written by the same
//! save share a version, so ordering within a version is append order.

pub mod path;

use serde_json::Value;

use crate::domain::case::{CaseTransaction, ChangeLogEntry};
use crate::domain::transaction::StrTransaction;
use crate::error::ChangeLogError;

pub use path::{FieldPath, Segment};

/// Replays `log` onto `base` and returns the resulting transaction.
///
/// Pure: the same base and log always produce the same output.
pub fn apply_changes(
    base: &StrTransaction,
    log: &[ChangeLogEntry],
) -> Result<StrTransaction, ChangeLogError> {
    if log.is_empty() {
        return Ok(base.clone());
    }

    let mut document = serde_json::to_value(base)?;

    let mut ordered: Vec<&ChangeLogEntry> = log.iter().collect();
    ordered.sort_by_key(|entry| entry.version);

    let mut replayed = base.clone();
    for entry in ordered {
        let path = FieldPath::parse(&entry.field)?;
        path.set(&mut document, entry.new_value.clone())?;

        replayed = serde_json::from_value(document)?;
        document = serde_json::to_value(&replayed)?;
        // A key the transaction has no field for is dropped by serde.
        if !entry.new_value.is_null() && path.get(&document).is_none() {
            return Err(ChangeLogError::PathNotApplicable {
                path: entry.field.clone(),
                reason: "no such field on a transaction".to_string(),
            });
        }
    }

    // The identifier is the key edits are filed under; it never moves.
    replayed.flow_of_funds_aml_transaction_id = base.flow_of_funds_aml_transaction_id.clone();
    Ok(replayed)
}

/// Displayed form of a stored transaction.
pub fn current_state(txn: &CaseTransaction) -> Result<StrTransaction, ChangeLogError> {
    apply_changes(&txn.base, &txn.change_logs)
}

/// Current value at `field` in the displayed form, `Null` when absent.
pub fn current_value(txn: &CaseTransaction, field: &str) -> Result<Value, ChangeLogError> {
    let path = FieldPath::parse(field)?;
    let document = serde_json::to_value(current_state(txn)?)?;
    Ok(path.get(&document).cloned().unwrap_or(Value::Null))
}

/// Builds the next entry for `txn`, stamped `session_version + 1`.
///
/// The entry is not attached to the transaction; the session commits it only
/// once the save carrying it succeeds.
pub fn append_change(
    txn: &CaseTransaction,
    field: &str,
    previous_value: Value,
    new_value: Value,
    session_version: u64,
) -> Result<ChangeLogEntry, ChangeLogError> {
    let path = FieldPath::parse(field)?;
    let version = session_version + 1;

    if let Some(last) = txn.last_version() {
        if last > version {
            return Err(ChangeLogError::NonMonotonicVersion { version, last });
        }
    }

    Ok(ChangeLogEntry {
        field: path.as_str().to_string(),
        previous_value,
        new_value,
        version,
    })
}

/// Like [`append_change`], capturing the previous value from the replayed state.
pub fn record_edit(
    txn: &CaseTransaction,
    field: &str,
    new_value: Value,
    session_version: u64,
) -> Result<ChangeLogEntry, ChangeLogError> {
    let previous_value = current_value(txn, field)?;
    append_change(txn, field, previous_value, new_value, session_version)
}

/// Appends entries to the transaction's log, enforcing non-decreasing versions.
pub fn push_entries(
    txn: &mut CaseTransaction,
    entries: impl IntoIterator<Item = ChangeLogEntry>,
) -> Result<(), ChangeLogError> {
    for entry in entries {
        if let Some(last) = txn.last_version() {
            if entry.version < last {
                return Err(ChangeLogError::NonMonotonicVersion {
                    version: entry.version,
                    last,
                });
            }
        }
        txn.change_logs.push(entry);
    }
    Ok(())
}
