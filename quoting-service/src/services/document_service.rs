//! Document service: the only writer of documents and lines.
//!
//! Every operation loads the current state, validates it against the state
//! machine and the calculator, computes the new state, persists it as one
//! atomic batch and returns a freshly loaded snapshot. Validation failures
//! return before anything is written.

use crate::domain::{
    calculator, lifecycle, versioning, DocumentError, NumberingAuthority, Totals,
    TransitionEffect,
};
use crate::models::{
    Actor, CreateDocument, Document, DocumentKind, DocumentStatus, Line, LineInput,
    UpdateDetails, UpdateLine,
};
use crate::services::metrics::{DOCUMENTS_ISSUED_TOTAL, ERRORS_TOTAL, OPERATIONS_TOTAL};
use crate::services::store::{DocumentStore, WriteBatch};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Trim free text; blank becomes `None`.
fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_line(input: LineInput) -> LineInput {
    LineInput {
        concept: input.concept.trim().to_string(),
        description: normalize_text(input.description),
        ..input
    }
}

/// Count the outcome of `operation` and pass the result through.
fn observe<T>(operation: &'static str, result: Result<T, DocumentError>) -> Result<T, DocumentError> {
    match &result {
        Ok(_) => {
            OPERATIONS_TOTAL.with_label_values(&[operation, "ok"]).inc();
        }
        Err(e) => {
            OPERATIONS_TOTAL
                .with_label_values(&[operation, "error"])
                .inc();
            ERRORS_TOTAL.with_label_values(&[e.label()]).inc();
            warn!(operation, error = %e, "Document operation failed");
        }
    }
    result
}

fn ensure_unique_order(document: &Document, line_id: Option<Uuid>, order: i32) -> Result<(), DocumentError> {
    let taken = document
        .lines
        .iter()
        .any(|line| Some(line.id) != line_id && line.line_order == order);
    if taken {
        return Err(DocumentError::InvalidLineInput(format!(
            "line_order {} is already used on document {}",
            order, document.id
        )));
    }
    Ok(())
}

/// Only quotes can be copied; invoices only ever come from conversion.
fn ensure_copyable(document: &Document) -> Result<(), DocumentError> {
    if document.kind != DocumentKind::Quote {
        return Err(DocumentError::IllegalTransition {
            kind: document.kind,
            from: document.status,
            to: DocumentStatus::Draft,
        });
    }
    Ok(())
}

/// Orchestrates the calculator, state machine, numbering and versioning
/// over a [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    numbering: NumberingAuthority,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, numbering: NumberingAuthority) -> Self {
        Self { store, numbering }
    }

    /// Create an empty draft quote with a provisional number.
    #[instrument(skip(self, input, actor), fields(actor = %actor.id()))]
    pub async fn create_document(
        &self,
        input: CreateDocument,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut draft =
                versioning::new_draft(DocumentKind::Quote, &self.numbering, actor, Utc::now());
            draft.client_reference = normalize_text(input.client_reference);
            draft.project_reference = normalize_text(input.project_reference);
            draft.valid_until = input.valid_until;
            draft.notes = normalize_text(input.notes);

            let id = draft.id;
            self.store
                .commit(WriteBatch::new().insert_document(draft))
                .await?;

            let document = self.store.load_document(id).await?;
            info!(document_id = %document.id, number = %document.number, "Draft quote created");
            Ok(document)
        }
        .await;

        observe("create_document", result)
    }

    #[instrument(skip(self))]
    pub async fn get_document(&self, document_id: Uuid) -> Result<Document, DocumentError> {
        Ok(self.store.load_document(document_id).await?)
    }

    /// Totals and per-rate tax summary of the stored lines.
    #[instrument(skip(self))]
    pub async fn tax_breakdown(&self, document_id: Uuid) -> Result<Totals, DocumentError> {
        let lines = self.store.load_lines(document_id).await?;
        calculator::aggregate(&lines)
    }

    /// Add a line to a draft and recompute its totals.
    #[instrument(skip(self, input, actor), fields(actor = %actor.id()))]
    pub async fn add_line(
        &self,
        document_id: Uuid,
        input: LineInput,
        actor: &Actor,
    ) -> Result<Line, DocumentError> {
        let result = async {
            let mut document = self.store.load_document(document_id).await?;
            lifecycle::ensure_lines_editable(&document)?;

            let input = normalize_line(input);
            let amounts = calculator::price_line(&input)?;
            let line_order = match input.line_order {
                Some(order) => order,
                None => document.next_line_order()?,
            };
            ensure_unique_order(&document, None, line_order)?;

            let now = Utc::now();
            let line = Line {
                id: Uuid::new_v4(),
                document_id,
                concept: input.concept,
                description: input.description,
                quantity: input.quantity,
                unit_price: input.unit_price,
                discount_percent: input.discount_percent.unwrap_or_default(),
                tax_rate: input.tax_rate,
                subtotal: amounts.subtotal,
                tax_amount: amounts.tax_amount,
                total: amounts.total,
                line_order,
                created_at: now,
            };

            document.lines.push(line.clone());
            versioning::refresh_totals(&mut document)?;
            document.touch(actor, now);

            self.store
                .commit(
                    WriteBatch::new()
                        .update_document(document)
                        .save_line(line.clone()),
                )
                .await?;

            info!(line_id = %line.id, total = %line.total, "Line added");
            Ok(self.store.load_line(line.id).await?)
        }
        .await;

        observe("add_line", result)
    }

    /// Apply a partial update to a line of a draft.
    #[instrument(skip(self, patch, actor), fields(actor = %actor.id()))]
    pub async fn update_line(
        &self,
        line_id: Uuid,
        patch: UpdateLine,
        actor: &Actor,
    ) -> Result<Line, DocumentError> {
        let result = async {
            let stored = self.store.load_line(line_id).await?;
            let mut document = self.store.load_document(stored.document_id).await?;
            lifecycle::ensure_lines_editable(&document)?;

            let input = normalize_line(patch.merged_with(&stored));
            let amounts = calculator::price_line(&input)?;
            let line_order = input.line_order.unwrap_or(stored.line_order);
            ensure_unique_order(&document, Some(line_id), line_order)?;

            let line = Line {
                concept: input.concept,
                description: input.description,
                quantity: input.quantity,
                unit_price: input.unit_price,
                discount_percent: input.discount_percent.unwrap_or_default(),
                tax_rate: input.tax_rate,
                subtotal: amounts.subtotal,
                tax_amount: amounts.tax_amount,
                total: amounts.total,
                line_order,
                ..stored
            };

            for existing in document.lines.iter_mut().filter(|l| l.id == line_id) {
                *existing = line.clone();
            }
            document.lines.sort_by_key(|l| l.line_order);
            versioning::refresh_totals(&mut document)?;
            document.touch(actor, Utc::now());

            self.store
                .commit(
                    WriteBatch::new()
                        .update_document(document)
                        .save_line(line),
                )
                .await?;

            info!(line_id = %line_id, "Line updated");
            Ok(self.store.load_line(line_id).await?)
        }
        .await;

        observe("update_line", result)
    }

    /// Remove a line from a draft.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn remove_line(&self, line_id: Uuid, actor: &Actor) -> Result<(), DocumentError> {
        let result = async {
            let stored = self.store.load_line(line_id).await?;
            let mut document = self.store.load_document(stored.document_id).await?;
            lifecycle::ensure_lines_editable(&document)?;

            document.lines.retain(|l| l.id != line_id);
            versioning::refresh_totals(&mut document)?;
            document.touch(actor, Utc::now());

            let document_id = document.id;
            self.store
                .commit(
                    WriteBatch::new()
                        .update_document(document)
                        .delete_line(document_id, line_id),
                )
                .await?;

            info!(line_id = %line_id, document_id = %document_id, "Line removed");
            Ok(())
        }
        .await;

        observe("remove_line", result)
    }

    /// Renumber the lines of a draft in the given order.
    #[instrument(skip(self, ordered_line_ids, actor), fields(actor = %actor.id()))]
    pub async fn reorder_lines(
        &self,
        document_id: Uuid,
        ordered_line_ids: Vec<Uuid>,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut document = self.store.load_document(document_id).await?;
            lifecycle::ensure_lines_editable(&document)?;

            let current: HashSet<Uuid> = document.lines.iter().map(|l| l.id).collect();
            let requested: HashSet<Uuid> = ordered_line_ids.iter().copied().collect();
            if requested.len() != ordered_line_ids.len() || requested != current {
                return Err(DocumentError::InvalidLineInput(
                    "line order must list every line of the document exactly once".to_string(),
                ));
            }

            let mut batch = WriteBatch::new();
            for line in document.lines.iter_mut() {
                if let Some(position) = ordered_line_ids.iter().position(|id| *id == line.id) {
                    line.line_order = position as i32 + 1;
                }
                batch = batch.save_line(line.clone());
            }
            document.lines.sort_by_key(|l| l.line_order);
            document.touch(actor, Utc::now());

            self.store
                .commit(batch.update_document(document))
                .await?;

            Ok(self.store.load_document(document_id).await?)
        }
        .await;

        observe("reorder_lines", result)
    }

    /// Replace the notes; allowed in every non-terminal status.
    #[instrument(skip(self, notes, actor), fields(actor = %actor.id()))]
    pub async fn update_notes(
        &self,
        document_id: Uuid,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut document = self.store.load_document(document_id).await?;
            lifecycle::ensure_notes_editable(&document)?;

            document.notes = normalize_text(notes);
            document.touch(actor, Utc::now());

            self.store
                .commit(WriteBatch::new().update_document(document))
                .await?;

            Ok(self.store.load_document(document_id).await?)
        }
        .await;

        observe("update_notes", result)
    }

    /// Edit client/project references and validity of a draft.
    #[instrument(skip(self, input, actor), fields(actor = %actor.id()))]
    pub async fn update_details(
        &self,
        document_id: Uuid,
        input: UpdateDetails,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut document = self.store.load_document(document_id).await?;
            lifecycle::ensure_lines_editable(&document)?;

            if let Some(client_reference) = input.client_reference {
                document.client_reference = normalize_text(Some(client_reference));
            }
            if let Some(project_reference) = input.project_reference {
                document.project_reference = normalize_text(Some(project_reference));
            }
            if input.valid_until.is_some() {
                document.valid_until = input.valid_until;
            }
            document.touch(actor, Utc::now());

            self.store
                .commit(WriteBatch::new().update_document(document))
                .await?;

            Ok(self.store.load_document(document_id).await?)
        }
        .await;

        observe("update_details", result)
    }

    /// Move a document to `target`, numbering it on the issuing edge.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn change_status(
        &self,
        document_id: Uuid,
        target: DocumentStatus,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut document = self.store.load_document(document_id).await?;
            let from = document.status;
            let effect = lifecycle::status_change(document.kind, from, target)?;

            let now = Utc::now();
            match effect {
                TransitionEffect::Issue => {
                    let number = self
                        .numbering
                        .finalize(self.store.as_ref(), &document)
                        .await?;
                    versioning::issue(&mut document, number, actor, now)?;
                }
                TransitionEffect::None => {
                    document.status = target;
                    document.touch(actor, now);
                }
                TransitionEffect::ConversionOnly => {
                    return Err(DocumentError::IllegalTransition {
                        kind: document.kind,
                        from,
                        to: target,
                    });
                }
            }

            let kind = document.kind;
            self.store
                .commit(WriteBatch::new().update_document(document))
                .await?;

            if effect == TransitionEffect::Issue {
                DOCUMENTS_ISSUED_TOTAL
                    .with_label_values(&[kind.as_str()])
                    .inc();
            }

            let document = self.store.load_document(document_id).await?;
            info!(
                document_id = %document_id,
                from = %from,
                to = %document.status,
                number = %document.number,
                "Document status changed"
            );
            Ok(document)
        }
        .await;

        observe("change_status", result)
    }

    /// Soft delete: cancel a document that was never issued.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn delete_document(
        &self,
        document_id: Uuid,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut document = self.store.load_document(document_id).await?;
            lifecycle::ensure_deletable(&document)?;

            document.status = DocumentStatus::Cancelled;
            document.touch(actor, Utc::now());

            self.store
                .commit(WriteBatch::new().update_document(document))
                .await?;

            info!(document_id = %document_id, "Draft cancelled");
            Ok(self.store.load_document(document_id).await?)
        }
        .await;

        observe("delete_document", result)
    }

    /// Branch a new draft from a quote, issuing the source first when it
    /// is still a draft so what was shown to the customer stays frozen.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn new_version(
        &self,
        document_id: Uuid,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut source = self.store.load_document(document_id).await?;
            ensure_copyable(&source)?;

            let now = Utc::now();
            let mut batch = WriteBatch::new();
            let issued_source = source.status == DocumentStatus::Draft;
            if issued_source {
                lifecycle::status_change(
                    source.kind,
                    source.status,
                    lifecycle::issued_status(source.kind),
                )?;
                let number = self
                    .numbering
                    .finalize(self.store.as_ref(), &source)
                    .await?;
                versioning::issue(&mut source, number, actor, now)?;
            }

            let draft = versioning::branch_draft(&source, &self.numbering, actor, now)?;
            let draft_id = draft.id;
            if issued_source {
                batch = batch.update_document(source.clone());
            }
            self.store
                .commit(batch.insert_document(draft))
                .await?;

            if issued_source {
                DOCUMENTS_ISSUED_TOTAL
                    .with_label_values(&[source.kind.as_str()])
                    .inc();
            }

            info!(
                source_id = %document_id,
                source_number = %source.number,
                draft_id = %draft_id,
                "New version created"
            );
            Ok(self.store.load_document(draft_id).await?)
        }
        .await;

        observe("new_version", result)
    }

    /// Copy a quote into a new draft without touching the source.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn duplicate(
        &self,
        document_id: Uuid,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let source = self.store.load_document(document_id).await?;
            ensure_copyable(&source)?;

            let draft = versioning::branch_draft(&source, &self.numbering, actor, Utc::now())?;
            let draft_id = draft.id;
            self.store
                .commit(WriteBatch::new().insert_document(draft))
                .await?;

            info!(source_id = %document_id, draft_id = %draft_id, "Document duplicated");
            Ok(self.store.load_document(draft_id).await?)
        }
        .await;

        observe("duplicate", result)
    }

    /// Turn an approved quote into an issued invoice; the quote becomes
    /// invoiced in the same batch.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn convert_to_invoice(
        &self,
        document_id: Uuid,
        actor: &Actor,
    ) -> Result<Document, DocumentError> {
        let result = async {
            let mut quote = self.store.load_document(document_id).await?;
            if quote.kind != DocumentKind::Quote {
                return Err(DocumentError::IllegalTransition {
                    kind: quote.kind,
                    from: quote.status,
                    to: DocumentStatus::Invoiced,
                });
            }
            // Check before reserving so a refused conversion burns no number.
            lifecycle::transition(quote.kind, quote.status, DocumentStatus::Invoiced)?;

            let number = self
                .numbering
                .reserve(self.store.as_ref(), DocumentKind::Invoice)
                .await?;
            let invoice =
                versioning::convert(&mut quote, number, &self.numbering, actor, Utc::now())?;
            let invoice_id = invoice.id;

            self.store
                .commit(
                    WriteBatch::new()
                        .update_document(quote)
                        .insert_document(invoice),
                )
                .await?;

            DOCUMENTS_ISSUED_TOTAL
                .with_label_values(&[DocumentKind::Invoice.as_str()])
                .inc();

            let invoice = self.store.load_document(invoice_id).await?;
            info!(
                quote_id = %document_id,
                invoice_id = %invoice_id,
                number = %invoice.number,
                total = %invoice.total,
                "Quote converted to invoice"
            );
            Ok(invoice)
        }
        .await;

        observe("convert_to_invoice", result)
    }
}
