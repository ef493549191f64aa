use crate::domain::lifecycle;
use crate::models::{Document, DocumentKind, DocumentStatus, Line};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct LineResponse {
    pub id: Uuid,
    pub document_id: Uuid,
    pub concept: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub line_order: i32,
}

impl From<Line> for LineResponse {
    fn from(line: Line) -> Self {
        Self {
            id: line.id,
            document_id: line.document_id,
            concept: line.concept,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_percent: line.discount_percent,
            tax_rate: line.tax_rate,
            subtotal: line.subtotal,
            tax_amount: line.tax_amount,
            total: line.total,
            line_order: line.line_order,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub number: String,
    pub number_is_final: bool,
    pub status: DocumentStatus,
    /// Statuses reachable through a plain status change.
    pub allowed_transitions: Vec<DocumentStatus>,
    pub client_reference: Option<String>,
    pub project_reference: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub lines: Vec<LineResponse>,
    pub source_document_id: Option<Uuid>,
    pub issued_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        let allowed_transitions = lifecycle::allowed_targets(doc.kind, doc.status);
        let number_is_final = doc.number.is_final();
        Self {
            id: doc.id,
            kind: doc.kind,
            number: doc.number.as_str().to_string(),
            number_is_final,
            status: doc.status,
            allowed_transitions,
            client_reference: doc.client_reference,
            project_reference: doc.project_reference,
            valid_until: doc.valid_until,
            notes: doc.notes,
            subtotal: doc.subtotal,
            tax_amount: doc.tax_amount,
            total: doc.total,
            lines: doc.lines.into_iter().map(LineResponse::from).collect(),
            source_document_id: doc.source_document_id,
            issued_at: doc.issued_at.map(rfc3339),
            created_by: doc.created_by,
            updated_by: doc.updated_by,
            version: doc.version,
            created_at: rfc3339(doc.created_at),
            updated_at: rfc3339(doc.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: DocumentStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderLinesRequest {
    pub line_ids: Vec<Uuid>,
}
