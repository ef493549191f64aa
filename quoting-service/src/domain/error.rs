//! Error taxonomy surfaced at the document service boundary.

use crate::models::{DocumentKind, DocumentStatus};
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid line input: {0}")]
    InvalidLineInput(String),

    #[error("Illegal {kind} transition from '{from}' to '{to}'")]
    IllegalTransition {
        kind: DocumentKind,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Document {document_id} is locked in status '{status}'")]
    DocumentLocked {
        document_id: Uuid,
        status: DocumentStatus,
    },

    #[error("Document {document_id} already carries final number '{number}'")]
    NumberingConflict { document_id: Uuid, number: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Document {0} was modified by another writer")]
    WriteConflict(Uuid),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
}

impl DocumentError {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentError::InvalidLineInput(_) => "invalid_line_input",
            DocumentError::IllegalTransition { .. } => "illegal_transition",
            DocumentError::DocumentLocked { .. } => "document_locked",
            DocumentError::NumberingConflict { .. } => "numbering_conflict",
            DocumentError::NotFound(_) => "not_found",
            DocumentError::WriteConflict(_) => "write_conflict",
            DocumentError::Storage(_) => "storage",
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::InvalidLineInput(_) => AppError::BadRequest(anyhow::Error::new(err)),
            DocumentError::IllegalTransition { .. }
            | DocumentError::DocumentLocked { .. }
            | DocumentError::WriteConflict(_) => AppError::Conflict(anyhow::Error::new(err)),
            DocumentError::NotFound(_) => AppError::NotFound(anyhow::Error::new(err)),
            DocumentError::NumberingConflict { .. } => {
                AppError::InternalError(anyhow::Error::new(err))
            }
            DocumentError::Storage(inner) => AppError::DatabaseError(inner),
        }
    }
}
