//! Line and document money calculation.
//!
//! Rounding happens once per line, to two decimal places. Document totals
//! are plain sums of already-rounded line amounts and are never rounded
//! again, so a printed document always adds up to its own lines.

use super::DocumentError;
use crate::models::{Line, LineInput};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Exclusive bound on any stored amount, matching `NUMERIC(18, 2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1874919424, 2328306, 0, false, 0);

fn ensure_in_range(value: Decimal, what: &str) -> Result<(), DocumentError> {
    if value.abs() >= MAX_AMOUNT {
        return Err(DocumentError::InvalidLineInput(format!(
            "{} out of range: {}",
            what, value
        )));
    }
    Ok(())
}

/// Derived amounts of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Tax summed per rate, as printed in tax summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxBreakdownEntry {
    pub rate: Decimal,
    pub taxable_base: Decimal,
    pub tax_amount: Decimal,
}

/// Document-level aggregation of a set of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub tax_breakdown: Vec<TaxBreakdownEntry>,
}

/// Round to the smallest currency unit, halves away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute a line's subtotal, tax and total from its raw inputs.
pub fn compute_line(
    quantity: Decimal,
    unit_price: Decimal,
    discount_percent: Decimal,
    tax_rate: Decimal,
) -> Result<LineAmounts, DocumentError> {
    if quantity <= Decimal::ZERO {
        return Err(DocumentError::InvalidLineInput(format!(
            "quantity must be greater than zero, got {}",
            quantity
        )));
    }
    if unit_price < Decimal::ZERO {
        return Err(DocumentError::InvalidLineInput(format!(
            "unit_price must not be negative, got {}",
            unit_price
        )));
    }
    if discount_percent < Decimal::ZERO || discount_percent > HUNDRED {
        return Err(DocumentError::InvalidLineInput(format!(
            "discount_percent must be between 0 and 100, got {}",
            discount_percent
        )));
    }
    if tax_rate < Decimal::ZERO {
        return Err(DocumentError::InvalidLineInput(format!(
            "tax_rate must not be negative, got {}",
            tax_rate
        )));
    }

    let out_of_range = || DocumentError::InvalidLineInput("line amount out of range".to_string());

    let discount_factor = Decimal::ONE - discount_percent / HUNDRED;
    let gross = quantity
        .checked_mul(unit_price)
        .and_then(|v| v.checked_mul(discount_factor))
        .ok_or_else(out_of_range)?;
    let subtotal = round2(gross);

    let tax_amount = subtotal
        .checked_mul(tax_rate)
        .map(|v| round2(v / HUNDRED))
        .ok_or_else(out_of_range)?;

    let total = subtotal.checked_add(tax_amount).ok_or_else(out_of_range)?;

    ensure_in_range(subtotal, "line subtotal")?;
    ensure_in_range(tax_amount, "line tax_amount")?;
    ensure_in_range(total, "line total")?;

    Ok(LineAmounts {
        subtotal,
        tax_amount,
        total,
    })
}

/// Validate a full line input, concept included, and price it.
pub fn price_line(input: &LineInput) -> Result<LineAmounts, DocumentError> {
    if input.concept.trim().is_empty() {
        return Err(DocumentError::InvalidLineInput(
            "concept must not be empty".to_string(),
        ));
    }

    compute_line(
        input.quantity,
        input.unit_price,
        input.discount_percent.unwrap_or(Decimal::ZERO),
        input.tax_rate,
    )
}

/// Sum line amounts into document totals and a per-rate tax breakdown.
///
/// The breakdown is sorted by rate, highest first, and drops rates whose
/// summed tax is exactly zero. Rates are normalised before grouping so
/// `21` and `21.00` land in the same bucket whatever the line order.
pub fn aggregate(lines: &[Line]) -> Result<Totals, DocumentError> {
    let out_of_range =
        || DocumentError::InvalidLineInput("document total out of range".to_string());
    let add = |acc: Decimal, value: Decimal| acc.checked_add(value).ok_or_else(out_of_range);

    let mut subtotal = Decimal::ZERO;
    let mut tax_amount = Decimal::ZERO;
    let mut groups: BTreeMap<Decimal, (Decimal, Decimal)> = BTreeMap::new();

    for line in lines {
        subtotal = add(subtotal, line.subtotal)?;
        tax_amount = add(tax_amount, line.tax_amount)?;

        let group = groups
            .entry(line.tax_rate.normalize())
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        group.0 = add(group.0, line.subtotal)?;
        group.1 = add(group.1, line.tax_amount)?;
    }
    let total = add(subtotal, tax_amount)?;

    for value in [subtotal, tax_amount, total] {
        if value.abs() >= MAX_AMOUNT {
            return Err(out_of_range());
        }
    }

    let tax_breakdown = groups
        .into_iter()
        .rev()
        .filter(|(_, (_, tax))| !tax.is_zero())
        .map(|(rate, (base, tax))| TaxBreakdownEntry {
            rate,
            taxable_base: base,
            tax_amount: tax,
        })
        .collect();

    Ok(Totals {
        subtotal,
        tax_amount,
        total,
        tax_breakdown,
    })
}
