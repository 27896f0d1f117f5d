#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use str_review_core::domain::case::{CaseSnapshot, SaveCaseRequest, SaveCaseResponse};
use str_review_core::domain::source::{FlowOfFundsEnvelope, SourceItem};
use str_review_core::error::{CaseServerError, LookupError};
use str_review_core::identity::IdentityResolver;
use str_review_core::normalize::Normalizer;
use str_review_core::ports::{
    AccountHolder, AccountInfo, AccountLookup, CaseServer, LookupResult, PartyInfo, PartyLookup,
};

#[derive(Default)]
pub struct FakeAccounts {
    accounts: HashMap<String, AccountInfo>,
    down: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeAccounts {
    pub fn with_account(mut self, account: &str, holders: &[&str]) -> Self {
        self.accounts.insert(
            account.to_string(),
            AccountInfo {
                account: account.to_string(),
                fi_number: Some("001".to_string()),
                branch: Some("00012".to_string()),
                account_type: Some("Personal".to_string()),
                account_currency: Some("CAD".to_string()),
                account_holders: holders
                    .iter()
                    .map(|key| AccountHolder {
                        party_key: key.to_string(),
                    })
                    .collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_outage(mut self, account: &str) -> Self {
        self.down.insert(account.to_string());
        self
    }
}

#[async_trait]
impl AccountLookup for FakeAccounts {
    async fn get_account_info(&self, account_number: &str) -> LookupResult<AccountInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.contains(account_number) {
            return Err(LookupError::Transport("connection refused".to_string()));
        }
        self.accounts
            .get(account_number)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(account_number.to_string()))
    }
}

#[derive(Default)]
pub struct FakeParties {
    parties: HashMap<String, PartyInfo>,
    down: bool,
}

impl FakeParties {
    pub fn with_person(mut self, key: &str, given: &str, surname: &str) -> Self {
        self.parties.insert(
            key.to_string(),
            PartyInfo {
                given_name: Some(given.to_string()),
                surname: Some(surname.to_string()),
                ..Default::default()
            },
        );
        self
    }

    pub fn unavailable() -> Self {
        Self {
            down: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PartyLookup for FakeParties {
    async fn get_party_info(&self, party_key: &str) -> LookupResult<PartyInfo> {
        if self.down {
            return Err(LookupError::Transport("timed out".to_string()));
        }
        self.parties
            .get(party_key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(party_key.to_string()))
    }
}

pub fn normalizer(accounts: FakeAccounts, parties: FakeParties) -> Normalizer {
    Normalizer::new(
        Arc::new(accounts),
        IdentityResolver::new(Arc::new(parties)),
    )
}

pub fn envelope(id: &str) -> FlowOfFundsEnvelope {
    serde_json::from_value(json!({
        "flowOfFundsAmlTransactionId": id,
        "flowOfFundsSourceTransactionId": format!("SRC-{}", id),
        "flowOfFundsTransactionDate": "2024-03-01",
        "flowOfFundsTransactionTime": "14:05:00",
        "flowOfFundsTransactionCurrency": "CAD"
    }))
    .unwrap()
}

pub fn item(id: &str, record: serde_json::Value) -> SourceItem {
    SourceItem {
        envelope: envelope(id),
        record: serde_json::from_value(record).unwrap(),
    }
}

pub fn abm_deposit(account: &str) -> serde_json::Value {
    json!({
        "sourceId": "ABM",
        "strSaDirection": "In",
        "strSaAmount": "500.00",
        "strSaAccount": account,
        "strCaDispositionType": "Deposit to account",
        "strCaAccount": account,
        "terminalId": "ATM-0042"
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Accept,
    Conflict,
    Fail,
}

/// Case server holding one case in memory.
pub struct FakeCaseServer {
    pub snapshot: Mutex<CaseSnapshot>,
    pub mode: Mutex<SaveMode>,
    pub save_delay: Option<Duration>,
    pub fetch_delay: Option<Duration>,
    pub fetch_down: AtomicBool,
    pub saves: Mutex<Vec<SaveCaseRequest>>,
    pub fetches: AtomicUsize,
}

impl FakeCaseServer {
    pub fn new(snapshot: CaseSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            mode: Mutex::new(SaveMode::Accept),
            save_delay: None,
            fetch_delay: None,
            fetch_down: AtomicBool::new(false),
            saves: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn set_fetch_down(&self, down: bool) {
        self.fetch_down.store(down, Ordering::SeqCst);
    }

    pub fn set_mode(&self, mode: SaveMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Simulates another reviewer saving the case.
    pub fn bump_version(&self) {
        self.snapshot.lock().unwrap().version += 1;
    }

    pub fn version(&self) -> u64 {
        self.snapshot.lock().unwrap().version
    }
}

#[async_trait]
impl CaseServer for FakeCaseServer {
    async fn fetch_case(&self, aml_id: &str) -> Result<CaseSnapshot, CaseServerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fetch_down.load(Ordering::SeqCst) {
            return Err(CaseServerError::Transport("connection refused".to_string()));
        }
        if aml_id == "MISSING" {
            return Err(CaseServerError::NotFound(aml_id.to_string()));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn save_case(
        &self,
        _aml_id: &str,
        request: &SaveCaseRequest,
    ) -> Result<SaveCaseResponse, CaseServerError> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        self.saves.lock().unwrap().push(request.clone());

        let mode = *self.mode.lock().unwrap();
        let mut snapshot = self.snapshot.lock().unwrap();
        match mode {
            SaveMode::Fail => Err(CaseServerError::Transport("503 Service Unavailable".to_string())),
            SaveMode::Conflict => Err(CaseServerError::VersionConflict {
                base_version: request.base_version,
            }),
            SaveMode::Accept if request.base_version != snapshot.version => {
                Err(CaseServerError::VersionConflict {
                    base_version: request.base_version,
                })
            }
            SaveMode::Accept => {
                snapshot.version += 1;
                snapshot.transactions = request.transactions.clone();
                snapshot.parties = request.parties.clone();
                let now = Utc::now();
                snapshot.last_updated = Some(now);
                Ok(SaveCaseResponse {
                    new_version: snapshot.version,
                    updated_at: Some(now),
                })
            }
        }
    }
}
