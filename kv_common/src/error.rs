use thiserror::Error;

use crate::Status;

/// Errors surfaced by a document store or by the helpers built on top of one
#[derive(Error, Debug)]
pub enum KvError {
    #[error("document not found ({0})")]
    DocumentNotFound(String),
    #[error("document already exists ({0})")]
    DocumentExists(String),
    #[error("cas mismatch ({0})")]
    CasMismatch(String),
    #[error("document locked ({0})")]
    DocumentLocked(String),
    #[error("document not locked ({0})")]
    DocumentNotLocked(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("vbucket {0} is not active")]
    NotMyVbucket(u16),
    #[error("gave up on {id} after {attempts} attempts")]
    RetriesExhausted { id: String, attempts: u32 },
    #[error("operation on {0} was cancelled")]
    Cancelled(String),
    #[error(transparent)]
    Encoding {
        #[from]
        source: serde_json::Error,
    },
}

/// Which operation produced a status. The same status maps to different
/// errors depending on what was asked of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Insert,
    Upsert,
    Replace,
    Remove,
    Touch,
    Unlock,
}

impl KvError {
    /// Map a status returned by the engine to the error a client sees
    pub fn from_status(status: Status, operation: Operation, id: &str, vbucket: u16) -> KvError {
        let id = id.to_string();
        match status {
            Status::KeyNotFound => KvError::DocumentNotFound(id),
            Status::KeyExists if operation == Operation::Insert => KvError::DocumentExists(id),
            Status::KeyExists => KvError::CasMismatch(id),
            Status::Locked => KvError::DocumentLocked(id),
            Status::NotLocked => KvError::DocumentNotLocked(id),
            Status::InvalidArguments => KvError::InvalidArgument(id),
            Status::NotMyVBucket => KvError::NotMyVbucket(vbucket),
        }
    }

    /// Conflicts are the only errors an optimistic writer should retry
    pub fn is_cas_mismatch(&self) -> bool {
        matches!(self, KvError::CasMismatch(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::DocumentNotFound(_))
    }
}
