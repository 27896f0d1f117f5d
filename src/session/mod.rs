//! Session state manager.
//!
//! Owns the versioned case document for one review session. Readers load
//! complete snapshots through `ArcSwap`; every write goes through a phase
//! transition guarded by a single lock, so at most one save or load is in
//! flight at a time.
//!
//! Phases: `Uninitialized -> Loading -> Ready -> Saving -> Ready` on success,
//! `Saving -> Conflict -> Loading -> Ready` on a version conflict, and
//! `Saving -> Ready` with the version unchanged on any other failure.

pub mod notifications;
pub mod view;

use arc_swap::ArcSwap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::changelog;
use crate::domain::case::{CaseRecord, CaseTransaction, ChangeLogEntry, SaveCaseRequest};
use crate::error::{CaseError, CaseServerError, ErrorKind};
use crate::normalize::NormalizedTransaction;
use crate::ports::CaseServer;
use crate::validation::{build_manual_transaction, ManualTransactionInput};

pub use notifications::{NotificationKind, Notifier, SessionNotification};
pub use view::{MaterializedView, StrTransactionData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    Ready,
    Saving,
    Conflict,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Loading => "loading",
            SessionPhase::Ready => "ready",
            SessionPhase::Saving => "saving",
            SessionPhase::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A consistent view of the session at one instant.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub case: Option<Arc<CaseRecord>>,
    pub view: Arc<MaterializedView>,
}

impl SessionSnapshot {
    fn uninitialized() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            case: None,
            view: Arc::new(Vec::new()),
        }
    }

    fn with_phase(&self, phase: SessionPhase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }
}

/// Edits to one transaction, as submitted by the reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub transaction_id: String,
    pub change_log_entries: Vec<ChangeLogEntry>,
}

pub struct SessionStateManager {
    server: Arc<dyn CaseServer>,
    state: ArcSwap<SessionSnapshot>,
    transition: Mutex<()>,
    notifier: Notifier,
}

impl SessionStateManager {
    pub fn new(server: Arc<dyn CaseServer>) -> Self {
        Self {
            server,
            state: ArcSwap::from_pointee(SessionSnapshot::uninitialized()),
            transition: Mutex::new(()),
            notifier: Notifier::new(),
        }
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.state.load_full()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.load().phase
    }

    pub fn case(&self) -> Option<Arc<CaseRecord>> {
        self.state.load().case.clone()
    }

    pub fn view(&self) -> Arc<MaterializedView> {
        self.state.load().view.clone()
    }

    pub fn saving_in_progress(&self) -> bool {
        self.phase() == SessionPhase::Saving
    }

    pub fn subscribe(&self) -> BroadcastStream<SessionNotification> {
        self.notifier.subscribe()
    }

    pub fn active_notifications(&self) -> Vec<SessionNotification> {
        self.notifier.active()
    }

    pub fn dismiss(&self, notification_id: Uuid) -> bool {
        self.notifier.dismiss(notification_id)
    }

    /// Atomically checks the current phase and moves to `next`. Returns the
    /// snapshot that was current before the move.
    fn begin(
        &self,
        allowed: &[SessionPhase],
        next: SessionPhase,
    ) -> Result<Arc<SessionSnapshot>, CaseError> {
        let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.state.load_full();
        if !allowed.contains(&current.phase) {
            return Err(match current.phase {
                SessionPhase::Saving => CaseError::SaveInProgress,
                SessionPhase::Uninitialized => CaseError::NoCase,
                phase => CaseError::InvalidState(phase.to_string()),
            });
        }

        self.state.store(Arc::new(current.with_phase(next)));
        Ok(current)
    }

    fn store(&self, snapshot: SessionSnapshot) {
        let phase = snapshot.phase;
        {
            let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
            self.state.store(Arc::new(snapshot));
        }
        tracing::debug!("Session phase is now {}", phase);
    }

    fn restore(&self, previous: &SessionSnapshot) {
        self.store(previous.clone());
    }

    /// Replaces local state with the server's copy of the case.
    pub async fn fetch_by_aml_id(&self, aml_id: &str) -> Result<Arc<CaseRecord>, CaseError> {
        let previous = self.begin(
            &[SessionPhase::Uninitialized, SessionPhase::Ready],
            SessionPhase::Loading,
        )?;

        tracing::info!("Loading case {}", aml_id);
        match self.load(aml_id).await {
            Ok(case) => Ok(case),
            Err(e) => {
                tracing::error!("Failed to load case {}: {}", aml_id, e);
                self.restore(&previous);
                if e.kind() == ErrorKind::Transport {
                    self.notifier.publish(SessionNotification::new(
                        NotificationKind::LoadFailed,
                        aml_id,
                        format!("Could not load the case: {}", e),
                    ));
                }
                Err(e.into())
            }
        }
    }

    async fn load(&self, aml_id: &str) -> Result<Arc<CaseRecord>, CaseServerError> {
        let snapshot = self.server.fetch_case(aml_id).await?;
        let case = Arc::new(snapshot.into_record(aml_id));
        let view = view::full_recompute(&case);

        tracing::info!(
            "Loaded case {} at version {} with {} transactions",
            aml_id,
            case.version,
            case.transactions.len()
        );
        self.store(SessionSnapshot {
            phase: SessionPhase::Ready,
            case: Some(case.clone()),
            view: Arc::new(view),
        });
        Ok(case)
    }

    /// Starts an empty case at version 0. Nothing is sent to the server until
    /// the first save.
    pub fn create_case(&self, aml_id: &str) -> Result<Arc<CaseRecord>, CaseError> {
        self.begin(
            &[SessionPhase::Uninitialized, SessionPhase::Ready],
            SessionPhase::Loading,
        )?;

        let case = Arc::new(CaseRecord::empty(aml_id));
        tracing::info!("Created case {}", aml_id);
        self.store(SessionSnapshot {
            phase: SessionPhase::Ready,
            case: Some(case.clone()),
            view: Arc::new(Vec::new()),
        });
        Ok(case)
    }

    /// Appends change-log entries and saves the case.
    ///
    /// Every entry is stamped `version + 1`. On a version conflict the local
    /// edits are discarded, the case is refetched, and the conflict error is
    /// returned once the refetch has finished.
    pub async fn update_transactions(
        &self,
        changes: Vec<PendingChange>,
    ) -> Result<Arc<CaseRecord>, CaseError> {
        let previous = self.begin(&[SessionPhase::Ready], SessionPhase::Saving)?;
        let Some(case) = previous.case.clone() else {
            self.restore(&previous);
            return Err(CaseError::NoCase);
        };

        let (transactions, edited) = match apply_pending(&case, &changes) {
            Ok(result) => result,
            Err(e) => {
                self.restore(&previous);
                return Err(e);
            }
        };

        let updated = CaseRecord {
            transactions,
            ..(*case).clone()
        };
        self.save(&previous, updated, edited).await
    }

    /// Records a single field edit, capturing the previous value from the
    /// currently displayed state.
    pub async fn edit_field(
        &self,
        transaction_id: &str,
        field: &str,
        new_value: Value,
    ) -> Result<Arc<CaseRecord>, CaseError> {
        let case = self.case().ok_or(CaseError::NoCase)?;
        let txn = case
            .transaction(transaction_id)
            .ok_or_else(|| CaseError::UnknownTransaction(transaction_id.to_string()))?;
        let entry = changelog::record_edit(txn, field, new_value, case.version)?;

        self.update_transactions(vec![PendingChange {
            transaction_id: transaction_id.to_string(),
            change_log_entries: vec![entry],
        }])
        .await
    }

    /// Adds normalized transactions to the case and saves it.
    ///
    /// Parties are merged into the case party list by identifier. A
    /// transaction id already present in the case is rejected.
    pub async fn add_transactions(
        &self,
        items: Vec<NormalizedTransaction>,
    ) -> Result<Arc<CaseRecord>, CaseError> {
        let previous = self.begin(&[SessionPhase::Ready], SessionPhase::Saving)?;
        let Some(case) = previous.case.clone() else {
            self.restore(&previous);
            return Err(CaseError::NoCase);
        };

        let mut updated = (*case).clone();
        let mut seen: HashSet<String> = updated.transaction_ids().into_iter().collect();
        let mut added = Vec::with_capacity(items.len());

        for item in items {
            let id = item.transaction.id().to_string();
            if !seen.insert(id.clone()) {
                self.restore(&previous);
                return Err(CaseError::DuplicateTransaction(id));
            }

            for party in item.parties {
                if updated.party(&party.party_identifier).is_none() {
                    updated.parties.push(party);
                }
            }
            updated
                .transactions
                .push(CaseTransaction::new(item.transaction));
            added.push(id);
        }

        tracing::info!("Adding {} transactions to case {}", added.len(), case.aml_id);
        self.save(&previous, updated, added).await
    }

    /// Builds a transaction from reviewer input and adds it to the case.
    ///
    /// Validation problems are tagged on the transaction, not raised.
    pub async fn add_manual_transaction(
        &self,
        input: ManualTransactionInput,
    ) -> Result<Arc<CaseRecord>, CaseError> {
        self.add_transactions(vec![NormalizedTransaction {
            transaction: build_manual_transaction(input),
            parties: Vec::new(),
            warnings: Vec::new(),
        }])
        .await
    }

    async fn save(
        &self,
        previous: &SessionSnapshot,
        updated: CaseRecord,
        edited: Vec<String>,
    ) -> Result<Arc<CaseRecord>, CaseError> {
        let base_version = updated.version;
        let request = SaveCaseRequest {
            base_version,
            transactions: updated.transactions.clone(),
            parties: updated.parties.clone(),
        };

        tracing::info!(
            "Saving case {} against version {} ({} edited)",
            updated.aml_id,
            base_version,
            edited.len()
        );

        match self.server.save_case(&updated.aml_id, &request).await {
            Ok(response) => {
                if response.new_version != base_version + 1 {
                    tracing::warn!(
                        "Case server returned version {} for a save based on {}",
                        response.new_version,
                        base_version
                    );
                }

                let case = Arc::new(CaseRecord {
                    version: response.new_version,
                    last_edited_transaction_ids: Some(edited),
                    last_updated: response.updated_at.or_else(|| Some(Utc::now())),
                    ..updated
                });
                let view = view::recompute(&previous.view, &case);

                tracing::info!("Saved case {} at version {}", case.aml_id, case.version);
                self.store(SessionSnapshot {
                    phase: SessionPhase::Ready,
                    case: Some(case.clone()),
                    view: Arc::new(view),
                });
                Ok(case)
            }
            Err(e @ CaseServerError::VersionConflict { .. }) => {
                self.handle_conflict(previous, &updated.aml_id, &e).await;
                Err(e.into())
            }
            Err(e) => {
                tracing::error!("Failed to save case {}: {}", updated.aml_id, e);
                self.restore(previous);
                self.notifier.publish(SessionNotification::new(
                    NotificationKind::SaveFailed,
                    updated.aml_id.as_str(),
                    format!("Your changes were not saved: {}", e),
                ));
                Err(e.into())
            }
        }
    }

    async fn handle_conflict(&self, previous: &SessionSnapshot, aml_id: &str, error: &CaseServerError) {
        tracing::warn!("Version conflict saving case {}: {}", aml_id, error);
        self.store(previous.with_phase(SessionPhase::Conflict));
        self.notifier.publish(SessionNotification::new(
            NotificationKind::VersionConflict,
            aml_id,
            "The case was changed by someone else. Your unsaved edits were discarded and the latest version was loaded.",
        ));

        self.store(previous.with_phase(SessionPhase::Loading));
        if let Err(refetch_error) = self.load(aml_id).await {
            tracing::error!("Refetch after conflict failed for {}: {}", aml_id, refetch_error);
            self.restore(&previous.with_phase(SessionPhase::Ready));
            self.notifier.publish(SessionNotification::new(
                NotificationKind::RefetchFailed,
                aml_id,
                format!("Could not reload the case: {}", refetch_error),
            ));
        }
    }
}

/// Applies pending changes to copies of the case transactions.
///
/// Entries are restamped `case.version + 1` and replayed once so an invalid
/// path is rejected before anything reaches the server.
fn apply_pending(
    case: &CaseRecord,
    changes: &[PendingChange],
) -> Result<(Vec<CaseTransaction>, Vec<String>), CaseError> {
    let mut transactions = case.transactions.clone();
    let mut edited: Vec<String> = Vec::new();

    for change in changes {
        let txn = transactions
            .iter_mut()
            .find(|txn| txn.id() == change.transaction_id)
            .ok_or_else(|| CaseError::UnknownTransaction(change.transaction_id.clone()))?;

        let mut stamped = Vec::with_capacity(change.change_log_entries.len());
        for entry in &change.change_log_entries {
            stamped.push(changelog::append_change(
                txn,
                &entry.field,
                entry.previous_value.clone(),
                entry.new_value.clone(),
                case.version,
            )?);
        }
        changelog::push_entries(txn, stamped)?;
        changelog::current_state(txn)?;

        if !edited.contains(&change.transaction_id) {
            edited.push(change.transaction_id.clone());
        }
    }

    Ok((transactions, edited))
}
