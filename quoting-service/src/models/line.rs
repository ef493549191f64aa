//! Line model for quoting-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Priced line on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Line {
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
    pub created_at: DateTime<Utc>,
}

impl Line {
    /// True when both lines carry the same content and amounts,
    /// ignoring identity, ownership and timestamps.
    pub fn same_content(&self, other: &Line) -> bool {
        self.concept == other.concept
            && self.description == other.description
            && self.quantity == other.quantity
            && self.unit_price == other.unit_price
            && self.discount_percent == other.discount_percent
            && self.tax_rate == other.tax_rate
            && self.subtotal == other.subtotal
            && self.tax_amount == other.tax_amount
            && self.total == other.total
            && self.line_order == other.line_order
    }
}

/// Input for adding a line.
#[derive(Debug, Clone, Deserialize)]
pub struct LineInput {
    pub concept: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Defaults to zero.
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    pub tax_rate: Decimal,
    /// Appended after the last line when absent.
    #[serde(default)]
    pub line_order: Option<i32>,
}

/// Partial update of a line; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLine {
    pub concept: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub line_order: Option<i32>,
}

impl UpdateLine {
    /// Overlay this patch on the stored line.
    pub fn merged_with(&self, line: &Line) -> LineInput {
        LineInput {
            concept: self.concept.clone().unwrap_or_else(|| line.concept.clone()),
            description: match &self.description {
                Some(d) => Some(d.clone()),
                None => line.description.clone(),
            },
            quantity: self.quantity.unwrap_or(line.quantity),
            unit_price: self.unit_price.unwrap_or(line.unit_price),
            discount_percent: Some(self.discount_percent.unwrap_or(line.discount_percent)),
            tax_rate: self.tax_rate.unwrap_or(line.tax_rate),
            line_order: Some(self.line_order.unwrap_or(line.line_order)),
        }
    }
}
