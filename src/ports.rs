//! Collaborator interfaces consumed by the core.
//! Implementations live in `clients` (HTTP) and in tests (in-memory fakes).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::case::{CaseSnapshot, SaveCaseRequest, SaveCaseResponse};
use crate::domain::party::PartyName;
use crate::domain::transaction::AccountDescriptor;
use crate::error::{CaseServerError, LookupError};

pub type LookupResult<T> = Result<T, LookupError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHolder {
    pub party_key: String,
}

/// Response of the account lookup service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account: String,
    #[serde(default)]
    pub fi_number: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub account_currency: Option<String>,
    #[serde(default)]
    pub account_status: Option<String>,
    #[serde(default)]
    pub account_open: Option<NaiveDate>,
    #[serde(default)]
    pub account_close: Option<NaiveDate>,
    #[serde(default)]
    pub account_holders: Vec<AccountHolder>,
}

impl AccountInfo {
    pub fn descriptor(&self) -> AccountDescriptor {
        AccountDescriptor {
            fi_number: self.fi_number.clone(),
            branch: self.branch.clone(),
            account: Some(self.account.clone()),
            account_type: self.account_type.clone(),
            account_currency: self.account_currency.clone(),
            account_status: self.account_status.clone(),
            account_open: self.account_open,
            account_close: self.account_close,
        }
    }

    /// Trimmed, non-blank holder keys in lookup order.
    pub fn holder_keys(&self) -> Vec<String> {
        self.account_holders
            .iter()
            .map(|holder| holder.party_key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Response of the party lookup service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInfo {
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub other_or_initial: Option<String>,
    #[serde(default)]
    pub name_of_entity: Option<String>,
}

impl PartyInfo {
    pub fn into_name(self) -> PartyName {
        PartyName {
            surname: self.surname,
            given_name: self.given_name,
            other_or_initial: self.other_or_initial,
            name_of_entity: self.name_of_entity,
        }
    }
}

#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn get_account_info(&self, account_number: &str) -> LookupResult<AccountInfo>;
}

#[async_trait]
pub trait PartyLookup: Send + Sync {
    async fn get_party_info(&self, party_key: &str) -> LookupResult<PartyInfo>;
}

#[async_trait]
pub trait CaseServer: Send + Sync {
    async fn fetch_case(&self, aml_id: &str) -> Result<CaseSnapshot, CaseServerError>;

    async fn save_case(
        &self,
        aml_id: &str,
        request: &SaveCaseRequest,
    ) -> Result<SaveCaseResponse, CaseServerError>;
}
