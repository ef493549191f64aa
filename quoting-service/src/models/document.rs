//! Document model for quoting-service.

use super::{DocumentStatus, Line};
use crate::domain::DocumentError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Quote,
    Invoice,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Invoice => "invoice",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quote" => Ok(DocumentKind::Quote),
            "invoice" => Ok(DocumentKind::Invoice),
            other => Err(anyhow::anyhow!("Unknown document kind '{}'", other)),
        }
    }
}

/// A document number: provisional while in draft, final once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum DocumentNumber {
    Provisional(String),
    Final(String),
}

impl DocumentNumber {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentNumber::Provisional(n) | DocumentNumber::Final(n) => n,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, DocumentNumber::Final(_))
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity collaborator's acting user, recorded on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor(pub String);

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Placeholder used when the caller did not identify itself.
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Quote or invoice snapshot.
///
/// `subtotal`, `tax_amount` and `total` are always the calculator's
/// aggregation of `lines`; only the document service writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub number: DocumentNumber,
    pub status: DocumentStatus,
    pub client_reference: Option<String>,
    pub project_reference: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<Line>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub source_document_id: Option<Uuid>,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every update.
    pub version: i64,
}

impl Document {
    /// Next free `line_order` slot.
    pub fn next_line_order(&self) -> Result<i32, DocumentError> {
        match self.lines.iter().map(|line| line.line_order).max() {
            None => Ok(1),
            Some(max) => max.checked_add(1).ok_or_else(|| {
                DocumentError::InvalidLineInput(
                    "no line_order left after the last line; pass one explicitly".to_string(),
                )
            }),
        }
    }

    /// Stamp the document as modified by `actor`.
    pub fn touch(&mut self, actor: &Actor, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = Some(actor.id().to_string());
    }
}

/// Input for creating a draft quote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDocument {
    pub client_reference: Option<String>,
    pub project_reference: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Header fields editable while a document is still a draft.
///
/// `None` leaves a field unchanged; `Some("")` clears a reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDetails {
    pub client_reference: Option<String>,
    pub project_reference: Option<String>,
    pub valid_until: Option<NaiveDate>,
}
