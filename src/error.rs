use thiserror::Error;

/// Coarse classification shared by every error in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A collaborator answered "no such record". Recovered locally.
    LookupNotFound,
    /// The collaborator could not be reached or answered garbage.
    Transport,
    /// The case server rejected a save based on a stale version.
    VersionConflict,
    /// Input failed domain validation.
    Validation,
    /// The operation is not allowed in the current session phase.
    InvalidState,
    Internal,
}

impl ErrorKind {
    /// Whether the reviewer must see an explicit notification for this kind.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, ErrorKind::Transport | ErrorKind::VersionConflict)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lookup request failed: {0}")]
    Transport(String),

    #[error("Invalid response from lookup service: {0}")]
    InvalidResponse(String),

    #[error("Circuit breaker open: {0}")]
    CircuitOpen(String),
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::NotFound(_) => ErrorKind::LookupNotFound,
            LookupError::Transport(_)
            | LookupError::InvalidResponse(_)
            | LookupError::CircuitOpen(_) => ErrorKind::Transport,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::InvalidResponse(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Wire record with role '{0}' cannot be normalized, only RECEIVER records are supported")]
    UnsupportedWireRole(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid amount in {field}: {value}")]
    InvalidAmount { field: &'static str, value: String },
}

impl NormalizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NormalizeError::Lookup(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeLogError {
    #[error("Invalid field path '{0}'")]
    InvalidPath(String),

    #[error("Field path '{path}' cannot be applied: {reason}")]
    PathNotApplicable { path: String, reason: String },

    #[error("Change log version {version} is older than the last entry ({last})")]
    NonMonotonicVersion { version: u64, last: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChangeLogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChangeLogError::Serialization(_) => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }
}

impl From<serde_json::Error> for ChangeLogError {
    fn from(err: serde_json::Error) -> Self {
        ChangeLogError::Serialization(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaseServerError {
    #[error("Case not found: {0}")]
    NotFound(String),

    #[error("Version conflict: case was saved against version {base_version}")]
    VersionConflict { base_version: u64 },

    #[error("Case server request failed: {0}")]
    Transport(String),

    #[error("Invalid response from case server: {0}")]
    InvalidResponse(String),
}

impl CaseServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaseServerError::VersionConflict { .. } => ErrorKind::VersionConflict,
            CaseServerError::NotFound(_) => ErrorKind::LookupNotFound,
            CaseServerError::Transport(_) | CaseServerError::InvalidResponse(_) => {
                ErrorKind::Transport
            }
        }
    }
}

impl From<reqwest::Error> for CaseServerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CaseServerError::InvalidResponse(err.to_string())
        } else {
            CaseServerError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaseError {
    #[error(transparent)]
    Server(#[from] CaseServerError),

    #[error(transparent)]
    ChangeLog(#[from] ChangeLogError),

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Operation not allowed while session is {0}")]
    InvalidState(String),

    #[error("No case is loaded")]
    NoCase,

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Transaction already present in case: {0}")]
    DuplicateTransaction(String),
}

impl CaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaseError::Server(e) => e.kind(),
            CaseError::ChangeLog(e) => e.kind(),
            CaseError::SaveInProgress | CaseError::InvalidState(_) | CaseError::NoCase => {
                ErrorKind::InvalidState
            }
            CaseError::UnknownTransaction(_) | CaseError::DuplicateTransaction(_) => {
                ErrorKind::Validation
            }
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        self.kind() == ErrorKind::VersionConflict
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::UnsupportedFormat(_) => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        }
    }
}
