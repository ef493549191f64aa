//! Numbering authority: provisional draft numbers and final sequential
//! numbers assigned once, at issuing.

use super::DocumentError;
use crate::models::{Document, DocumentKind, DocumentNumber};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Source of per-kind monotonically increasing counters.
///
/// Each call must atomically reserve a value no other caller will ever see.
#[async_trait]
pub trait SequenceSource: Send + Sync {
    async fn next_sequence_value(&self, kind: DocumentKind) -> Result<i64, DocumentError>;
}

/// Prefixes and padding used when formatting numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct NumberingConfig {
    #[serde(default = "default_provisional_prefix")]
    pub provisional_prefix: String,
    #[serde(default = "default_quote_prefix")]
    pub quote_prefix: String,
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
    #[serde(default = "default_padding")]
    pub padding: usize,
}

fn default_provisional_prefix() -> String {
    "BORR-".to_string()
}

fn default_quote_prefix() -> String {
    "PRES-".to_string()
}

fn default_invoice_prefix() -> String {
    "FAC-".to_string()
}

fn default_padding() -> usize {
    5
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            provisional_prefix: default_provisional_prefix(),
            quote_prefix: default_quote_prefix(),
            invoice_prefix: default_invoice_prefix(),
            padding: default_padding(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NumberingAuthority {
    config: NumberingConfig,
}

impl NumberingAuthority {
    pub fn new(config: NumberingConfig) -> Self {
        Self { config }
    }

    /// Display-only number for a draft, derived from its id.
    pub fn provisional_number(&self, id: Uuid) -> DocumentNumber {
        let simple = id.simple().to_string().to_uppercase();
        DocumentNumber::Provisional(format!("{}{}", self.config.provisional_prefix, &simple[..8]))
    }

    fn prefix(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Quote => &self.config.quote_prefix,
            DocumentKind::Invoice => &self.config.invoice_prefix,
        }
    }

    pub fn format_final(&self, kind: DocumentKind, value: i64) -> DocumentNumber {
        DocumentNumber::Final(format!(
            "{}{:0>width$}",
            self.prefix(kind),
            value,
            width = self.config.padding
        ))
    }

    /// Reserve and format the next final number for `document`.
    ///
    /// A document that already carries a final number is a caller bug and
    /// fails with `NumberingConflict` without touching the counter.
    #[instrument(skip(self, sequences, document), fields(document_id = %document.id, kind = %document.kind))]
    pub async fn finalize<S: SequenceSource + ?Sized>(
        &self,
        sequences: &S,
        document: &Document,
    ) -> Result<DocumentNumber, DocumentError> {
        if let DocumentNumber::Final(number) = &document.number {
            error!(number = %number, "Refusing to finalize an already numbered document");
            return Err(DocumentError::NumberingConflict {
                document_id: document.id,
                number: number.clone(),
            });
        }

        let value = sequences.next_sequence_value(document.kind).await?;
        let number = self.format_final(document.kind, value);

        info!(number = %number, "Final number reserved");

        Ok(number)
    }

    /// Number for a document created directly in an issued state.
    pub async fn reserve<S: SequenceSource + ?Sized>(
        &self,
        sequences: &S,
        kind: DocumentKind,
    ) -> Result<DocumentNumber, DocumentError> {
        let value = sequences.next_sequence_value(kind).await?;
        Ok(self.format_final(kind, value))
    }
}
