//! Domain-option validation for transactions built by hand.
//!
//! Violations never abort a build; they are attached to the transaction so a
//! reviewer can see which rows need attention.

use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::transaction::{
    CompletingAction, StartingAction, StrTransaction, DIRECTION_IN, DIRECTION_OUT,
    DISPOSITION_CASH_WITHDRAWAL, DISPOSITION_DEPOSIT, DISPOSITION_OUTGOING_EMAIL_TRANSFER,
    DISPOSITION_PURCHASE, FUNDS_CASH, FUNDS_CHEQUE, FUNDS_DEBIT_CARD, FUNDS_EMAIL_TRANSFER,
    FUNDS_INTERNATIONAL_TRANSFER, FUNDS_WITHDRAWAL, METHOD_ABM, METHOD_IN_PERSON, METHOD_ONLINE,
    METHOD_OTHER,
};

pub const DESCRIPTION_MAX_LEN: usize = 4000;
pub const PURPOSE_MAX_LEN: usize = 200;

pub const DIRECTIONS: &[&str] = &[DIRECTION_IN, DIRECTION_OUT];
pub const FUNDS_TYPES: &[&str] = &[
    FUNDS_CASH,
    FUNDS_CHEQUE,
    FUNDS_WITHDRAWAL,
    FUNDS_EMAIL_TRANSFER,
    FUNDS_INTERNATIONAL_TRANSFER,
    FUNDS_DEBIT_CARD,
];
pub const DISPOSITIONS: &[&str] = &[
    DISPOSITION_DEPOSIT,
    DISPOSITION_CASH_WITHDRAWAL,
    DISPOSITION_OUTGOING_EMAIL_TRANSFER,
    DISPOSITION_PURCHASE,
];
pub const METHODS: &[&str] = &[METHOD_ABM, METHOD_IN_PERSON, METHOD_ONLINE, METHOD_OTHER];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Field path of the offending value, e.g. `startingActions.0.typeOfFunds`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .split(|ch: char| ch.is_whitespace() || ch.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

pub fn validate_non_negative_amount(field: &str, amount: &BigDecimal) -> ValidationResult {
    if amount < &BigDecimal::zero() {
        return Err(ValidationError::new(field, "must not be negative"));
    }

    Ok(())
}

pub fn validate_currency(field: &str, currency: &str) -> ValidationResult {
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            field,
            "must be a three letter ISO currency code",
        ));
    }

    Ok(())
}

fn push_err(errors: &mut Vec<ValidationError>, result: ValidationResult) {
    if let Err(e) = result {
        errors.push(e);
    }
}

fn validate_optional_enum(
    errors: &mut Vec<ValidationError>,
    field: String,
    value: Option<&String>,
    allowed: &[&str],
) {
    match value {
        Some(value) => push_err(errors, validate_enum(&field, value, allowed)),
        None => errors.push(ValidationError::new(field, "must not be empty")),
    }
}

fn validate_money(
    errors: &mut Vec<ValidationError>,
    prefix: &str,
    amount: Option<&BigDecimal>,
    currency: Option<&String>,
) {
    if let Some(amount) = amount {
        push_err(
            errors,
            validate_non_negative_amount(&format!("{}.amount", prefix), amount),
        );
    }
    if let Some(currency) = currency {
        push_err(
            errors,
            validate_currency(&format!("{}.currency", prefix), currency),
        );
    }
}

fn validate_starting_action(errors: &mut Vec<ValidationError>, index: usize, sa: &StartingAction) {
    let prefix = format!("startingActions.{}", index);
    validate_optional_enum(
        errors,
        format!("{}.direction", prefix),
        sa.direction.as_ref(),
        DIRECTIONS,
    );
    validate_optional_enum(
        errors,
        format!("{}.typeOfFunds", prefix),
        sa.type_of_funds.as_ref(),
        FUNDS_TYPES,
    );
    validate_money(errors, &prefix, sa.amount.as_ref(), sa.currency.as_ref());
}

fn validate_completing_action(
    errors: &mut Vec<ValidationError>,
    index: usize,
    ca: &CompletingAction,
) {
    let prefix = format!("completingActions.{}", index);
    validate_optional_enum(
        errors,
        format!("{}.detailsOfDisposition", prefix),
        ca.details_of_disposition.as_ref(),
        DISPOSITIONS,
    );
    validate_money(errors, &prefix, ca.amount.as_ref(), ca.currency.as_ref());
}

/// Every domain-option violation in `txn`. Empty when the transaction is valid.
pub fn validate_transaction(txn: &StrTransaction) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    push_err(
        &mut errors,
        validate_required("flowOfFundsAmlTransactionId", &txn.flow_of_funds_aml_transaction_id),
    );
    if txn.date_of_transaction.is_none() {
        errors.push(ValidationError::new("dateOfTransaction", "must not be empty"));
    }
    validate_optional_enum(
        &mut errors,
        "methodOfTransaction".to_string(),
        txn.method_of_transaction.as_ref(),
        METHODS,
    );
    if let Some(purpose) = &txn.purpose_of_transaction {
        push_err(
            &mut errors,
            validate_max_len("purposeOfTransaction", purpose, PURPOSE_MAX_LEN),
        );
    }
    if let Some(description) = &txn.description_of_transaction {
        push_err(
            &mut errors,
            validate_max_len("descriptionOfTransaction", description, DESCRIPTION_MAX_LEN),
        );
    }

    if txn.starting_actions.is_empty() {
        errors.push(ValidationError::new(
            "startingActions",
            "must contain at least one action",
        ));
    }
    for (index, sa) in txn.starting_actions.iter().enumerate() {
        validate_starting_action(&mut errors, index, sa);
    }

    if txn.completing_actions.is_empty() {
        errors.push(ValidationError::new(
            "completingActions",
            "must contain at least one action",
        ));
    }
    for (index, ca) in txn.completing_actions.iter().enumerate() {
        validate_completing_action(&mut errors, index, ca);
    }

    errors
}

/// Reviewer input for a transaction entered by hand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualTransactionInput {
    #[serde(default)]
    pub flow_of_funds_aml_transaction_id: Option<String>,
    #[serde(default)]
    pub date_of_transaction: Option<NaiveDate>,
    #[serde(default)]
    pub time_of_transaction: Option<NaiveTime>,
    #[serde(default)]
    pub method_of_transaction: Option<String>,
    #[serde(default)]
    pub reporting_entity_location_no: Option<String>,
    #[serde(default)]
    pub purpose_of_transaction: Option<String>,
    #[serde(default)]
    pub description_of_transaction: Option<String>,
    #[serde(default)]
    pub starting_actions: Vec<StartingAction>,
    #[serde(default)]
    pub completing_actions: Vec<CompletingAction>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| sanitize_string(&v))
        .filter(|v| !v.is_empty())
}

fn clean_starting(mut sa: StartingAction) -> StartingAction {
    sa.direction = clean(sa.direction);
    sa.type_of_funds = clean(sa.type_of_funds);
    sa.currency = clean(sa.currency).map(|c| c.to_uppercase());
    sa
}

fn clean_completing(mut ca: CompletingAction) -> CompletingAction {
    ca.details_of_disposition = clean(ca.details_of_disposition);
    ca.currency = clean(ca.currency).map(|c| c.to_uppercase());
    ca
}

/// Builds a transaction from reviewer input, tagging it with every
/// validation error instead of failing.
pub fn build_manual_transaction(input: ManualTransactionInput) -> StrTransaction {
    let id = clean(input.flow_of_funds_aml_transaction_id)
        .unwrap_or_else(|| format!("MANUAL-{}", Uuid::new_v4()));

    let mut txn = StrTransaction {
        flow_of_funds_aml_transaction_id: id,
        date_of_transaction: input.date_of_transaction,
        time_of_transaction: input.time_of_transaction,
        method_of_transaction: clean(input.method_of_transaction),
        reporting_entity_location_no: clean(input.reporting_entity_location_no),
        purpose_of_transaction: clean(input.purpose_of_transaction),
        description_of_transaction: clean(input.description_of_transaction),
        starting_actions: input.starting_actions.into_iter().map(clean_starting).collect(),
        completing_actions: input
            .completing_actions
            .into_iter()
            .map(clean_completing)
            .collect(),
        ..Default::default()
    };

    txn.validation_errors = validate_transaction(&txn);
    if !txn.validation_errors.is_empty() {
        tracing::warn!(
            "Manual transaction {} has {} validation errors",
            txn.flow_of_funds_aml_transaction_id,
            txn.validation_errors.len()
        );
    }
    txn
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn valid_input() -> ManualTransactionInput {
        serde_json::from_value(json!({
            "flowOfFundsAmlTransactionId": "M1",
            "dateOfTransaction": "2024-03-01",
            "methodOfTransaction": "In-Person",
            "startingActions": [
                { "direction": "In", "typeOfFunds": "Cash", "amount": "500.00", "currency": "cad" }
            ],
            "completingActions": [
                { "detailsOfDisposition": "Deposit to account", "amount": "500.00", "currency": "CAD" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("direction", "In", DIRECTIONS).is_ok());
        assert!(validate_enum("direction", "Sideways", DIRECTIONS).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "ab cd");
    }

    #[test]
    fn keeps_words_apart_across_line_breaks() {
        let mut input = valid_input();
        input.description_of_transaction = Some("Rent\tpayment\nfor March".to_string());

        let txn = build_manual_transaction(input);
        assert_eq!(
            txn.description_of_transaction.as_deref(),
            Some("Rent payment for March")
        );
    }

    #[test]
    fn validates_amount_and_currency() {
        let negative = BigDecimal::from_str("-0.01").unwrap();
        assert!(validate_non_negative_amount("amount", &BigDecimal::zero()).is_ok());
        assert!(validate_non_negative_amount("amount", &negative).is_err());
        assert!(validate_currency("currency", "CAD").is_ok());
        assert!(validate_currency("currency", "cad").is_err());
        assert!(validate_currency("currency", "CADX").is_err());
    }

    #[test]
    fn builds_valid_manual_transaction() {
        let txn = build_manual_transaction(valid_input());

        assert_eq!(txn.id(), "M1");
        assert!(txn.validation_errors.is_empty(), "{:?}", txn.validation_errors);
        assert_eq!(txn.starting_actions[0].currency.as_deref(), Some("CAD"));
    }

    #[test]
    fn tags_invalid_fields_without_failing() {
        let mut input = valid_input();
        input.flow_of_funds_aml_transaction_id = None;
        input.starting_actions[0].type_of_funds = Some("Gold bars".to_string());
        input.completing_actions[0].amount = Some(BigDecimal::from_str("-5").unwrap());

        let txn = build_manual_transaction(input);

        assert!(txn.id().starts_with("MANUAL-"));
        let fields: Vec<&str> = txn
            .validation_errors
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(
            fields,
            vec!["startingActions.0.typeOfFunds", "completingActions.0.amount"]
        );
    }

    #[test]
    fn requires_both_sides() {
        let input = ManualTransactionInput {
            flow_of_funds_aml_transaction_id: Some("M2".to_string()),
            date_of_transaction: NaiveDate::from_ymd_opt(2024, 3, 1),
            method_of_transaction: Some("Other".to_string()),
            ..Default::default()
        };

        let txn = build_manual_transaction(input);
        let fields: Vec<&str> = txn
            .validation_errors
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(fields, vec!["startingActions", "completingActions"]);
    }
}
