//! Builders for issuing, branching new versions and converting quotes into
//! invoices. Pure: the document service supplies numbers and persists.

use super::{calculator, lifecycle, DocumentError, NumberingAuthority};
use crate::models::{Actor, Document, DocumentKind, DocumentNumber, DocumentStatus, Line};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Fresh, empty draft of `kind`.
pub fn new_draft(
    kind: DocumentKind,
    numbering: &NumberingAuthority,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Document {
    let id = Uuid::new_v4();
    Document {
        id,
        kind,
        number: numbering.provisional_number(id),
        status: lifecycle::initial_status(kind),
        client_reference: None,
        project_reference: None,
        valid_until: None,
        notes: None,
        lines: Vec::new(),
        subtotal: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        total: Decimal::ZERO,
        source_document_id: None,
        issued_at: None,
        created_by: Some(actor.id().to_string()),
        updated_by: Some(actor.id().to_string()),
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

/// Recompute the derived totals of `document` from its lines.
pub fn refresh_totals(document: &mut Document) -> Result<(), DocumentError> {
    let totals = calculator::aggregate(&document.lines)?;
    document.subtotal = totals.subtotal;
    document.tax_amount = totals.tax_amount;
    document.total = totals.total;
    Ok(())
}

/// Apply the issuing transition with the number the authority reserved.
pub fn issue(
    document: &mut Document,
    number: DocumentNumber,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<(), DocumentError> {
    let target = lifecycle::issued_status(document.kind);
    lifecycle::status_change(document.kind, document.status, target)?;

    if let DocumentNumber::Final(existing) = &document.number {
        return Err(DocumentError::NumberingConflict {
            document_id: document.id,
            number: existing.clone(),
        });
    }

    document.number = number;
    document.status = target;
    document.issued_at = Some(now);
    document.touch(actor, now);
    Ok(())
}

/// Copy of `line` owned by `document_id`, with a new identity.
pub fn copy_line(line: &Line, document_id: Uuid, now: DateTime<Utc>) -> Line {
    Line {
        id: Uuid::new_v4(),
        document_id,
        created_at: now,
        ..line.clone()
    }
}

/// New draft seeded from `source`'s references, notes and lines.
///
/// The copy keeps no link to `source` beyond `source_document_id`.
pub fn branch_draft(
    source: &Document,
    numbering: &NumberingAuthority,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Document, DocumentError> {
    let mut draft = new_draft(source.kind, numbering, actor, now);
    draft.client_reference = source.client_reference.clone();
    draft.project_reference = source.project_reference.clone();
    draft.valid_until = source.valid_until;
    draft.notes = source.notes.clone();
    draft.source_document_id = Some(source.id);
    draft.lines = source
        .lines
        .iter()
        .map(|line| copy_line(line, draft.id, now))
        .collect();
    refresh_totals(&mut draft)?;
    Ok(draft)
}

/// Build the invoice for an approved quote and mark the quote invoiced.
///
/// Returns the invoice; `quote` is updated in place. Nothing is changed
/// when the quote is not approved.
pub fn convert(
    quote: &mut Document,
    invoice_number: DocumentNumber,
    numbering: &NumberingAuthority,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Document, DocumentError> {
    if quote.kind != DocumentKind::Quote {
        return Err(DocumentError::IllegalTransition {
            kind: quote.kind,
            from: quote.status,
            to: DocumentStatus::Invoiced,
        });
    }
    lifecycle::transition(quote.kind, quote.status, DocumentStatus::Invoiced)?;

    let mut invoice = new_draft(DocumentKind::Invoice, numbering, actor, now);
    invoice.client_reference = quote.client_reference.clone();
    invoice.project_reference = quote.project_reference.clone();
    invoice.notes = quote.notes.clone();
    invoice.source_document_id = Some(quote.id);
    invoice.lines = quote
        .lines
        .iter()
        .map(|line| copy_line(line, invoice.id, now))
        .collect();
    refresh_totals(&mut invoice)?;
    issue(&mut invoice, invoice_number, actor, now)?;

    quote.status = DocumentStatus::Invoiced;
    quote.touch(actor, now);

    Ok(invoice)
}
