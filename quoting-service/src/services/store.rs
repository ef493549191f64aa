//! Persistence boundary consumed by the document service.

use crate::domain::{DocumentError, SequenceSource};
use crate::models::{Document, Line};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Write conflict on document {0}")]
    WriteConflict(Uuid),

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<StoreError> for DocumentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => DocumentError::NotFound(what),
            StoreError::WriteConflict(id) => DocumentError::WriteConflict(id),
            StoreError::Backend(e) => DocumentError::Storage(e),
        }
    }
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert a new document together with its lines.
    InsertDocument(Document),
    /// Overwrite the document header if its stored `version` still equals
    /// the one carried here; the store bumps the version on success.
    UpdateDocument(Document),
    /// Insert or replace a line.
    SaveLine(Line),
    DeleteLine { document_id: Uuid, line_id: Uuid },
}

/// Writes applied all together or not at all.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_document(mut self, document: Document) -> Self {
        self.ops.push(WriteOp::InsertDocument(document));
        self
    }

    pub fn update_document(mut self, document: Document) -> Self {
        self.ops.push(WriteOp::UpdateDocument(document));
        self
    }

    pub fn save_line(mut self, line: Line) -> Self {
        self.ops.push(WriteOp::SaveLine(line));
        self
    }

    pub fn delete_line(mut self, document_id: Uuid, line_id: Uuid) -> Self {
        self.ops.push(WriteOp::DeleteLine {
            document_id,
            line_id,
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Storage collaborator. Implementations must apply a [`WriteBatch`]
/// atomically and report stale versions as [`StoreError::WriteConflict`].
#[async_trait]
pub trait DocumentStore: SequenceSource {
    /// Document header with its lines ordered by `line_order`.
    async fn load_document(&self, id: Uuid) -> Result<Document, StoreError>;

    async fn load_lines(&self, document_id: Uuid) -> Result<Vec<Line>, StoreError>;

    async fn load_line(&self, line_id: Uuid) -> Result<Line, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
