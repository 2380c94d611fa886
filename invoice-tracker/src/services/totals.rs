//! Invoice aggregation: line totals, subtotal, tax and grand total.
//!
//! Pure decimal arithmetic with no I/O. Every rounding step uses two decimal places,
//! half away from zero, so `2.125` becomes `2.13`. Quantities and rates are not
//! checked for sign; negative inputs simply flow through the arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::models::{CreateLineItem, InvoiceAmounts};

/// Tax rate applied when none is configured (8.5%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(85, 0, 0, false, 3);

/// Currency scale used for every stored amount.
pub const CURRENCY_SCALE: u32 = 2;

/// Digits left of the point in a `NUMERIC(12, 2)` amount column.
pub const MONEY_INTEGER_DIGITS: u32 = 10;

/// Whether a computed amount still fits its `NUMERIC(12, 2)` column.
pub fn fits_money_column(value: Decimal) -> bool {
    value.abs() < Decimal::from(10u64.pow(MONEY_INTEGER_DIGITS))
}

/// Raw line item as submitted by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

impl LineItemInput {
    pub fn new(description: impl Into<String>, quantity: Decimal, rate: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            rate,
        }
    }
}

/// A line item with its computed total.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub total: Decimal,
}

/// Result of aggregating an ordered sequence of line items.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTotals {
    pub line_items: Vec<ComputedLineItem>,
    pub amounts: InvoiceAmounts,
}

impl InvoiceTotals {
    /// Line items ready for persistence, keeping submission order in `sort_order`.
    pub fn to_create_line_items(&self) -> Vec<CreateLineItem> {
        self.line_items
            .iter()
            .enumerate()
            .map(|(index, item)| CreateLineItem {
                description: item.description.clone(),
                quantity: item.quantity,
                rate: item.rate,
                total: item.total,
                sort_order: index as i32,
            })
            .collect()
    }
}

/// Round to currency precision.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `round(quantity * rate, 2)`.
pub fn line_total(quantity: Decimal, rate: Decimal) -> Decimal {
    round_currency(quantity * rate)
}

/// Compute per-line totals, then subtotal, tax and total.
///
/// An empty slice yields all-zero amounts; rejecting empty invoices is up to the caller.
pub fn compute_invoice_totals(items: &[LineItemInput], tax_rate: Decimal) -> InvoiceTotals {
    let line_items: Vec<ComputedLineItem> = items
        .iter()
        .map(|item| ComputedLineItem {
            description: item.description.clone(),
            quantity: item.quantity,
            rate: item.rate,
            total: line_total(item.quantity, item.rate),
        })
        .collect();

    let subtotal: Decimal = line_items.iter().map(|item| item.total).sum();
    let tax = round_currency(subtotal * tax_rate);

    InvoiceTotals {
        line_items,
        amounts: InvoiceAmounts {
            subtotal,
            tax,
            total: subtotal + tax,
        },
    }
}

/// Parse a decimal amount as typed into a form (`"12.50"`, `" 3 "`).
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}
