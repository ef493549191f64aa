//! In-process document store.
//!
//! Used when no database is configured and by the test suite. A batch is
//! applied to a copy of the state which replaces the original only when
//! every write succeeded.

use super::store::{DocumentStore, StoreError, WriteBatch, WriteOp};
use crate::domain::{DocumentError, SequenceSource};
use crate::models::{Document, DocumentKind, Line};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    /// Headers; `lines` is always empty here.
    documents: HashMap<Uuid, Document>,
    lines: HashMap<Uuid, Line>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    sequences: RwLock<HashMap<DocumentKind, i64>>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` fail with a backend error, to exercise
    /// all-or-nothing paths.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub async fn document_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn line_count(&self) -> usize {
        self.state.read().await.lines.len()
    }

    fn assemble(state: &MemoryState, id: Uuid) -> Result<Document, StoreError> {
        let mut document = state
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Document {}", id)))?;
        document.lines = Self::lines_of(state, id);
        Ok(document)
    }

    fn lines_of(state: &MemoryState, document_id: Uuid) -> Vec<Line> {
        let mut lines: Vec<Line> = state
            .lines
            .values()
            .filter(|line| line.document_id == document_id)
            .cloned()
            .collect();
        lines.sort_by_key(|line| line.line_order);
        lines
    }

    fn apply(state: &mut MemoryState, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::InsertDocument(mut document) => {
                if state.documents.contains_key(&document.id) {
                    return Err(StoreError::WriteConflict(document.id));
                }
                for line in document.lines.drain(..) {
                    state.lines.insert(line.id, line);
                }
                state.documents.insert(document.id, document);
            }
            WriteOp::UpdateDocument(mut document) => {
                let stored = state
                    .documents
                    .get(&document.id)
                    .ok_or_else(|| StoreError::NotFound(format!("Document {}", document.id)))?;
                if stored.version != document.version {
                    return Err(StoreError::WriteConflict(document.id));
                }
                document.version += 1;
                document.lines.clear();
                state.documents.insert(document.id, document);
            }
            WriteOp::SaveLine(line) => {
                if !state.documents.contains_key(&line.document_id) {
                    return Err(StoreError::NotFound(format!(
                        "Document {}",
                        line.document_id
                    )));
                }
                state.lines.insert(line.id, line);
            }
            WriteOp::DeleteLine {
                document_id,
                line_id,
            } => match state.lines.get(&line_id) {
                Some(line) if line.document_id == document_id => {
                    state.lines.remove(&line_id);
                }
                _ => return Err(StoreError::NotFound(format!("Line {}", line_id))),
            },
        }
        Ok(())
    }
}

#[async_trait]
impl SequenceSource for MemoryStore {
    async fn next_sequence_value(&self, kind: DocumentKind) -> Result<i64, DocumentError> {
        let mut sequences = self.sequences.write().await;
        let value = sequences.entry(kind).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load_document(&self, id: Uuid) -> Result<Document, StoreError> {
        let state = self.state.read().await;
        Self::assemble(&state, id)
    }

    async fn load_lines(&self, document_id: Uuid) -> Result<Vec<Line>, StoreError> {
        let state = self.state.read().await;
        if !state.documents.contains_key(&document_id) {
            return Err(StoreError::NotFound(format!("Document {}", document_id)));
        }
        Ok(Self::lines_of(&state, document_id))
    }

    async fn load_line(&self, line_id: Uuid) -> Result<Line, StoreError> {
        let state = self.state.read().await;
        state
            .lines
            .get(&line_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Line {}", line_id)))
    }

    #[instrument(skip(self, batch), fields(ops = batch.ops().len()))]
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "Injected commit failure"
            )));
        }

        let mut state = self.state.write().await;
        let mut staged = state.clone();
        for op in batch.into_ops() {
            Self::apply(&mut staged, op)?;
        }
        *state = staged;

        debug!("Batch committed");
        Ok(())
    }
}
