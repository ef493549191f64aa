//! Document state machine.
//!
//! Every status and lock question is answered from the two transition
//! tables below; nothing else in the crate hard-codes status rules.
//!
//! Expiry is a manual `sent -> expired` change like any other. No job
//! sweeps quotes past `valid_until`; the date is informational.

use super::DocumentError;
use crate::models::{Document, DocumentKind, DocumentStatus};

use DocumentStatus::*;

/// What a legal transition implies beyond the status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    None,
    /// Assign the final number and lock lines.
    Issue,
    /// Only reachable through quote-to-invoice conversion.
    ConversionOnly,
}

struct Edge {
    from: DocumentStatus,
    to: DocumentStatus,
    effect: TransitionEffect,
}

const fn edge(from: DocumentStatus, to: DocumentStatus, effect: TransitionEffect) -> Edge {
    Edge { from, to, effect }
}

const QUOTE_TRANSITIONS: &[Edge] = &[
    edge(Draft, Sent, TransitionEffect::Issue),
    edge(Draft, Cancelled, TransitionEffect::None),
    edge(Sent, Approved, TransitionEffect::None),
    edge(Sent, Rejected, TransitionEffect::None),
    // Expiry is recorded by hand; `valid_until` alone never moves a quote.
    edge(Sent, Expired, TransitionEffect::None),
    edge(Approved, Rejected, TransitionEffect::None),
    edge(Rejected, Approved, TransitionEffect::None),
    edge(Approved, Invoiced, TransitionEffect::ConversionOnly),
];

const INVOICE_TRANSITIONS: &[Edge] = &[
    edge(Draft, Issued, TransitionEffect::Issue),
    edge(Draft, Cancelled, TransitionEffect::None),
    edge(Issued, Paid, TransitionEffect::None),
    edge(Issued, Cancelled, TransitionEffect::None),
];

fn table(kind: DocumentKind) -> &'static [Edge] {
    match kind {
        DocumentKind::Quote => QUOTE_TRANSITIONS,
        DocumentKind::Invoice => INVOICE_TRANSITIONS,
    }
}

/// Status a newly created document of `kind` starts in.
pub fn initial_status(_kind: DocumentKind) -> DocumentStatus {
    Draft
}

/// Status reached by the issuing edge of `kind`.
pub fn issued_status(kind: DocumentKind) -> DocumentStatus {
    match kind {
        DocumentKind::Quote => Sent,
        DocumentKind::Invoice => Issued,
    }
}

/// Look up `from -> to` in the table for `kind`.
pub fn transition(
    kind: DocumentKind,
    from: DocumentStatus,
    to: DocumentStatus,
) -> Result<TransitionEffect, DocumentError> {
    table(kind)
        .iter()
        .find(|e| e.from == from && e.to == to)
        .map(|e| e.effect)
        .ok_or(DocumentError::IllegalTransition { kind, from, to })
}

/// Validate a bare status write. Conversion-only edges are refused here.
pub fn status_change(
    kind: DocumentKind,
    from: DocumentStatus,
    to: DocumentStatus,
) -> Result<TransitionEffect, DocumentError> {
    match transition(kind, from, to)? {
        TransitionEffect::ConversionOnly => {
            Err(DocumentError::IllegalTransition { kind, from, to })
        }
        effect => Ok(effect),
    }
}

/// Statuses reachable from `from` through a bare status write.
pub fn allowed_targets(kind: DocumentKind, from: DocumentStatus) -> Vec<DocumentStatus> {
    table(kind)
        .iter()
        .filter(|e| e.from == from && e.effect != TransitionEffect::ConversionOnly)
        .map(|e| e.to)
        .collect()
}

/// A status with no outgoing edges.
pub fn is_terminal(kind: DocumentKind, status: DocumentStatus) -> bool {
    !table(kind).iter().any(|e| e.from == status)
}

pub fn can_edit_lines(status: DocumentStatus) -> bool {
    status == Draft
}

pub fn can_edit_notes(kind: DocumentKind, status: DocumentStatus) -> bool {
    !is_terminal(kind, status)
}

pub fn ensure_lines_editable(document: &Document) -> Result<(), DocumentError> {
    if can_edit_lines(document.status) {
        Ok(())
    } else {
        Err(DocumentError::DocumentLocked {
            document_id: document.id,
            status: document.status,
        })
    }
}

pub fn ensure_notes_editable(document: &Document) -> Result<(), DocumentError> {
    if can_edit_notes(document.kind, document.status) {
        Ok(())
    } else {
        Err(DocumentError::DocumentLocked {
            document_id: document.id,
            status: document.status,
        })
    }
}

/// Deleting is cancelling a document that was never issued.
pub fn ensure_deletable(document: &Document) -> Result<(), DocumentError> {
    if document.status != Draft {
        return Err(DocumentError::IllegalTransition {
            kind: document.kind,
            from: document.status,
            to: Cancelled,
        });
    }
    transition(document.kind, document.status, Cancelled).map(|_| ())
}
