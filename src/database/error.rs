use thiserror::Error;

/// Failures talking to the storage backend.
///
/// "No matching row" is never a `StorageError`; repositories report it as
/// `None` / `false`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Storage backend rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Unexpected storage response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage backend returned no row for {0}")]
    MissingRepresentation(&'static str),
}

impl StorageError {
    fn sqlstate(&self) -> Option<&str> {
        match self {
            StorageError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            StorageError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Integrity constraint violations (SQLSTATE class 23) or HTTP 409.
    pub fn is_constraint_violation(&self) -> bool {
        self.status() == Some(409) || self.sqlstate().is_some_and(|c| c.starts_with("23"))
    }

    /// Row-level security or privilege denial.
    pub fn is_permission_denied(&self) -> bool {
        self.status() == Some(403) || self.sqlstate() == Some("42501")
    }

    /// The backend refused the credential itself.
    pub fn is_credential_rejected(&self) -> bool {
        self.status() == Some(401) && !self.is_permission_denied()
    }
}
