//! CSV and JSON export of the materialized case view.

use csv::Writer;
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ExportError;
use crate::session::StrTransactionData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// CSV row representation - amounts as strings, one row per transaction
#[derive(Debug, Serialize)]
struct TransactionCsvRow {
    transaction_id: String,
    date_of_transaction: String,
    time_of_transaction: String,
    method_of_transaction: String,
    source: String,
    description: String,
    starting_actions: usize,
    completing_actions: usize,
    total_debited: String,
    total_credited: String,
    currency: String,
    parties: String,
    change_log_version: String,
    validation_errors: usize,
}

impl From<&StrTransactionData> for TransactionCsvRow {
    fn from(row: &StrTransactionData) -> Self {
        let tx = &row.transaction;
        let currency = tx
            .starting_actions
            .iter()
            .find_map(|sa| sa.currency.clone())
            .or_else(|| tx.completing_actions.iter().find_map(|ca| ca.currency.clone()))
            .unwrap_or_default();

        TransactionCsvRow {
            transaction_id: tx.flow_of_funds_aml_transaction_id.clone(),
            date_of_transaction: tx
                .date_of_transaction
                .map(|d| d.to_string())
                .unwrap_or_default(),
            time_of_transaction: tx
                .time_of_transaction
                .map(|t| t.to_string())
                .unwrap_or_default(),
            method_of_transaction: tx.method_of_transaction.clone().unwrap_or_default(),
            source: tx.flow_of_funds.flow_of_funds_source.clone().unwrap_or_default(),
            description: tx.description_of_transaction.clone().unwrap_or_default(),
            starting_actions: tx.starting_actions.len(),
            completing_actions: tx.completing_actions.len(),
            total_debited: tx.total_debited().to_string(),
            total_credited: tx.total_credited().to_string(),
            currency,
            parties: row
                .party_names
                .values()
                .cloned()
                .collect::<Vec<_>>()
                .join("; "),
            change_log_version: row
                .change_log_version
                .map(|v| v.to_string())
                .unwrap_or_default(),
            validation_errors: tx.validation_errors.len(),
        }
    }
}

pub fn write_csv<W: Write>(rows: &[Arc<StrTransactionData>], writer: W) -> Result<(), ExportError> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(TransactionCsvRow::from(row.as_ref()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(rows: &[Arc<StrTransactionData>], writer: W) -> Result<(), ExportError> {
    let plain: Vec<&StrTransactionData> = rows.iter().map(AsRef::as_ref).collect();
    serde_json::to_writer_pretty(writer, &plain)?;
    Ok(())
}

pub fn export<W: Write>(
    rows: &[Arc<StrTransactionData>],
    format: ExportFormat,
    writer: W,
) -> Result<(), ExportError> {
    tracing::info!("Exporting {} transactions as {:?}", rows.len(), format);
    match format {
        ExportFormat::Csv => write_csv(rows, writer),
        ExportFormat::Json => write_json(rows, writer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::{CompletingAction, StartingAction, StrTransaction};
    use bigdecimal::BigDecimal;
    use std::collections::BTreeMap;

    fn row() -> Arc<StrTransactionData> {
        let amount = |v: &str| Some(BigDecimal::from_str(v).unwrap());
        let mut party_names = BTreeMap::new();
        party_names.insert("abc".to_string(), "Marie Tremblay".to_string());

        Arc::new(StrTransactionData {
            transaction: StrTransaction {
                flow_of_funds_aml_transaction_id: "T1".to_string(),
                method_of_transaction: Some("In-Person".to_string()),
                starting_actions: vec![
                    StartingAction {
                        amount: amount("6000.00"),
                        currency: Some("CAD".to_string()),
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
            },
            change_log_version: Some(3),
            party_names,
            replay_error: None,
        })
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_csv_row_sums_each_side() {
        let mut out = Vec::new();
        write_csv(&[row()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("transaction_id,"));
        let data = lines.next().unwrap();
        assert!(data.contains("10800.00,10800.00,CAD,Marie Tremblay,3,0"), "{}", data);
    }

    #[test]
    fn test_json_export_is_flat() {
        let mut out = Vec::new();
        write_json(&[row()], &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value[0]["flowOfFundsAmlTransactionId"], "T1");
        assert_eq!(value[0]["changeLogVersion"], 3);
        assert_eq!(value[0]["partyNames"]["abc"], "Marie Tremblay");
    }
}
