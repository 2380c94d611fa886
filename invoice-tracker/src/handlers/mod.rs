//! HTTP handlers for invoice-tracker.
//!
//! Request bodies carry decimals and dates as strings, the way form posts send
//! them. They are parsed here; anything unparseable is a 400.

pub mod clients;
pub mod dashboard;
pub mod expenses;
pub mod invoices;
pub mod reminders;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use validator::ValidationError;

use crate::models::InvoiceStatus;
use crate::services::totals::{parse_amount, CURRENCY_SCALE, MONEY_INTEGER_DIGITS};

/// Reject strings that are empty once trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, AppError> {
    parse_amount(raw).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("{} '{}' is not a valid number", field, raw))
    })
}

/// Parse a decimal that must fit a `NUMERIC(precision, scale)` column, where
/// `integer_digits = precision - scale`. Trailing zeros do not count toward the scale.
pub fn parse_bounded_decimal(
    field: &str,
    raw: &str,
    scale: u32,
    integer_digits: u32,
) -> Result<Decimal, AppError> {
    let value = parse_decimal(field, raw)?;
    if value.normalize().scale() > scale {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} '{}' has more than {} decimal places",
            field,
            raw,
            scale
        )));
    }
    if value.abs() >= Decimal::from(10u64.pow(integer_digits)) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} '{}' is too large",
            field,
            raw
        )));
    }
    Ok(value)
}

/// Line item quantity or rate, stored as `NUMERIC(12, 4)`.
pub fn parse_line_decimal(field: &str, raw: &str) -> Result<Decimal, AppError> {
    parse_bounded_decimal(field, raw, 4, 8)
}

/// Currency amount, stored as `NUMERIC(12, 2)`.
pub fn parse_money(field: &str, raw: &str) -> Result<Decimal, AppError> {
    parse_bounded_decimal(field, raw, CURRENCY_SCALE, MONEY_INTEGER_DIGITS)
}

pub fn parse_optional_money(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, AppError> {
    raw.map(|r| parse_money(field, r)).transpose()
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(anyhow::anyhow!("{} '{}' is not a YYYY-MM-DD date", field, raw))
    })
}

pub fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    raw.map(|r| parse_date(field, r)).transpose()
}

pub fn parse_status(raw: &str) -> Result<InvoiceStatus, AppError> {
    InvoiceStatus::parse(raw)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Unknown invoice status '{}'", raw)))
}
