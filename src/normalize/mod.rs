//! Source normalizers.
//!
//! Each source system maps its raw record plus the flow-of-funds envelope
//! into a canonical `StrTransaction` and the distinct parties it references.

mod abm;
pub mod names;
mod olb;
mod otc;
mod pos;
pub(crate) mod shared;
mod wire;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::party::Party;
use crate::domain::source::{FlowOfFundsEnvelope, SourceItem, SourceTransactionRecord};
use crate::domain::transaction::StrTransaction;
use crate::error::NormalizeError;
use crate::identity::IdentityResolver;
use crate::ports::AccountLookup;
use crate::utils::sanitize::sanitize_json;
use shared::Collaborators;

pub use otc::parse_cheque_amount;

/// A lookup that answered not-found. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LookupWarning {
    #[serde(rename_all = "camelCase")]
    AccountNotFound { account: String },
    #[serde(rename_all = "camelCase")]
    PartyNotFound { party_key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    pub transaction: StrTransaction,
    pub parties: Vec<Party>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LookupWarning>,
}

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Clone)]
pub struct Normalizer {
    accounts: Arc<dyn AccountLookup>,
    identity: IdentityResolver,
    concurrency: usize,
}

impl Normalizer {
    pub fn new(accounts: Arc<dyn AccountLookup>, identity: IdentityResolver) -> Self {
        Self {
            accounts,
            identity,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            accounts: self.accounts.as_ref(),
            identity: &self.identity,
        }
    }

    /// Normalizes one raw record.
    pub async fn normalize(
        &self,
        record: &SourceTransactionRecord,
        envelope: &FlowOfFundsEnvelope,
    ) -> Result<NormalizedTransaction, NormalizeError> {
        let ctx = self.collaborators();
        let result = match record {
            SourceTransactionRecord::Abm(raw) => abm::normalize(ctx, raw, envelope).await,
            SourceTransactionRecord::Otc(raw) => otc::normalize(ctx, raw, envelope).await,
            SourceTransactionRecord::Olb(raw) => olb::normalize(ctx, raw, envelope).await,
            SourceTransactionRecord::Wire(raw) => wire::normalize(ctx, raw, envelope).await,
            SourceTransactionRecord::Pos(raw) => pos::normalize(ctx, raw, envelope).await,
        };

        if let Err(e) = &result {
            tracing::error!(
                "Failed to normalize {} transaction {}: {}",
                record.source_system().as_str(),
                envelope.flow_of_funds_aml_transaction_id,
                e
            );
            if let Ok(raw) = serde_json::to_value(record) {
                tracing::debug!("Rejected record: {}", sanitize_json(&raw));
            }
        }
        result
    }

    pub async fn normalize_item(
        &self,
        item: &SourceItem,
    ) -> Result<NormalizedTransaction, NormalizeError> {
        self.normalize(&item.record, &item.envelope).await
    }

    /// Normalizes a batch with bounded concurrency.
    ///
    /// One result per input, in input order. A failed record never affects
    /// its siblings.
    pub async fn normalize_batch(
        &self,
        items: &[SourceItem],
    ) -> Vec<Result<NormalizedTransaction, NormalizeError>> {
        tracing::info!(
            "Normalizing batch of {} records (concurrency {})",
            items.len(),
            self.concurrency
        );

        let results: Vec<_> = stream::iter(items)
            .map(|item| self.normalize_item(item))
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!("{} of {} records failed to normalize", failed, results.len());
        }
        results
    }
}
