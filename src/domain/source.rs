//! Raw source-system records.
//! Each banking subsystem produces its own shape; they are modelled as
//! distinct variants of one tagged union so every normalizer can match
//! exhaustively.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Source-system discriminator, also stamped into `flowOfFundsSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceSystem {
    #[serde(rename = "ABM")]
    Abm,
    #[serde(rename = "OTC")]
    Otc,
    #[serde(rename = "OLB")]
    Olb,
    #[serde(rename = "WIRE")]
    Wire,
    #[serde(rename = "POS")]
    Pos,
}

impl SourceSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::Abm => "ABM",
            SourceSystem::Otc => "OTC",
            SourceSystem::Olb => "OLB",
            SourceSystem::Wire => "WIRE",
            SourceSystem::Pos => "POS",
        }
    }
}

/// Flow-of-funds envelope shared by every leg of one underlying event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowOfFundsEnvelope {
    pub flow_of_funds_aml_transaction_id: String,
    #[serde(default)]
    pub flow_of_funds_source_transaction_id: Option<String>,
    #[serde(default)]
    pub flow_of_funds_transaction_date: Option<NaiveDate>,
    #[serde(default)]
    pub flow_of_funds_transaction_time: Option<NaiveTime>,
    #[serde(default)]
    pub flow_of_funds_posting_date: Option<NaiveDate>,
    #[serde(default)]
    pub flow_of_funds_posting_time: Option<NaiveTime>,
    #[serde(default)]
    pub flow_of_funds_credited_account: Option<String>,
    #[serde(default)]
    pub flow_of_funds_credited_transit: Option<String>,
    #[serde(default)]
    pub flow_of_funds_credit_amount: Option<BigDecimal>,
    #[serde(default)]
    pub flow_of_funds_debited_account: Option<String>,
    #[serde(default)]
    pub flow_of_funds_debited_transit: Option<String>,
    #[serde(default)]
    pub flow_of_funds_debit_amount: Option<BigDecimal>,
    #[serde(default)]
    pub flow_of_funds_transaction_currency: Option<String>,
    #[serde(default)]
    pub flow_of_funds_transaction_currency_amount: Option<BigDecimal>,
    #[serde(default)]
    pub flow_of_funds_transaction_desc: Option<String>,
    #[serde(default)]
    pub reporting_entity_location_no: Option<String>,
}

/// ABM (automated banking machine) record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbmSourceRecord {
    pub str_sa_direction: String,
    #[serde(default)]
    pub str_sa_funds_type: Option<String>,
    #[serde(default)]
    pub str_sa_amount: Option<BigDecimal>,
    #[serde(default)]
    pub str_sa_currency: Option<String>,
    #[serde(default)]
    pub str_sa_fi_number: Option<String>,
    #[serde(default)]
    pub str_sa_branch: Option<String>,
    #[serde(default)]
    pub str_sa_account: Option<String>,
    pub str_ca_disposition_type: String,
    #[serde(default)]
    pub str_ca_amount: Option<BigDecimal>,
    #[serde(default)]
    pub str_ca_currency: Option<String>,
    #[serde(default)]
    pub str_ca_fi_number: Option<String>,
    #[serde(default)]
    pub str_ca_branch: Option<String>,
    #[serde(default)]
    pub str_ca_account: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub terminal_id: Option<String>,
}

/// Over-the-counter (in-person, branch) record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtcSourceRecord {
    pub str_sa_direction: String,
    #[serde(default)]
    pub str_sa_funds_type: Option<String>,
    /// Free-text amount breakdown, e.g. "Cash and cheque deposit (cheque $6,000.00)".
    #[serde(default)]
    pub str_sa_amount_description: Option<String>,
    #[serde(default)]
    pub str_sa_amount: Option<BigDecimal>,
    #[serde(default)]
    pub str_sa_currency: Option<String>,
    #[serde(default)]
    pub str_sa_account: Option<String>,
    #[serde(default)]
    pub str_conductor_party_key: Option<String>,
    #[serde(default)]
    pub str_conductor_name: Option<String>,
    pub str_ca_disposition_type: String,
    #[serde(default)]
    pub str_ca_amount: Option<BigDecimal>,
    #[serde(default)]
    pub str_ca_currency: Option<String>,
    #[serde(default)]
    pub str_ca_fi_number: Option<String>,
    #[serde(default)]
    pub str_ca_branch: Option<String>,
    #[serde(default)]
    pub str_ca_account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferDirection {
    Incoming,
    Outgoing,
}

/// Online banking / e-transfer (EMT) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OlbSourceRecord {
    pub direction: TransferDirection,
    /// The reporting entity's own customer account.
    pub customer_account: String,
    /// Online banking user that initiated or received the transfer.
    #[serde(default)]
    pub customer_party_key: Option<String>,
    /// Set when the counterparty also banks with the reporting entity.
    #[serde(default)]
    pub counterparty_account: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub recipient_email: Option<String>,
    pub amount: BigDecimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub emt_reference: Option<String>,
}

/// Incoming wire (receiver side) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSourceRecord {
    /// "RECEIVER" or "SENDER".
    pub role: String,
    pub beneficiary_account: String,
    pub amount: BigDecimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub ordering_customer_name: Option<String>,
    #[serde(default)]
    pub ordering_customer_account: Option<String>,
    #[serde(default)]
    pub ordering_customer_address: Option<String>,
    #[serde(default)]
    pub ordering_customer_country: Option<String>,
    /// Raw tag 50 block as received.
    #[serde(default)]
    pub tag_50: Option<String>,
    /// Ordering institution BIC (tag 52).
    #[serde(default)]
    pub ordering_institution: Option<String>,
    /// Remittance information (tag 70).
    #[serde(default)]
    pub remittance_information: Option<String>,
}

/// Point-of-sale (debit card purchase) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosSourceRecord {
    pub card_number: String,
    pub account: String,
    #[serde(default)]
    pub cardholder_party_key: Option<String>,
    pub amount: BigDecimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub merchant_name: String,
    #[serde(default)]
    pub merchant_street: Option<String>,
    #[serde(default)]
    pub merchant_city: Option<String>,
    #[serde(default)]
    pub merchant_province: Option<String>,
    #[serde(default)]
    pub merchant_postal_code: Option<String>,
    #[serde(default)]
    pub merchant_country: Option<String>,
    #[serde(default)]
    pub memo_line: Option<String>,
}

/// Tagged union over the raw record shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sourceId")]
pub enum SourceTransactionRecord {
    #[serde(rename = "ABM")]
    Abm(AbmSourceRecord),
    #[serde(rename = "OTC")]
    Otc(OtcSourceRecord),
    #[serde(rename = "OLB")]
    Olb(OlbSourceRecord),
    #[serde(rename = "WIRE")]
    Wire(WireSourceRecord),
    #[serde(rename = "POS")]
    Pos(PosSourceRecord),
}

impl SourceTransactionRecord {
    pub fn source_system(&self) -> SourceSystem {
        match self {
            SourceTransactionRecord::Abm(_) => SourceSystem::Abm,
            SourceTransactionRecord::Otc(_) => SourceSystem::Otc,
            SourceTransactionRecord::Olb(_) => SourceSystem::Olb,
            SourceTransactionRecord::Wire(_) => SourceSystem::Wire,
            SourceTransactionRecord::Pos(_) => SourceSystem::Pos,
        }
    }
}

/// One unit of normalization input: a raw record plus its envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceItem {
    pub envelope: FlowOfFundsEnvelope,
    pub record: SourceTransactionRecord,
}
