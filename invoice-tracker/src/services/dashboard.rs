//! Dashboard statistics computed from an owner's invoice history.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{Invoice, InvoiceStatus};

/// Invoices issued within this many days (today included) make a client active.
pub const ACTIVE_CLIENT_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub outstanding: Decimal,
    pub outstanding_count: usize,
    pub this_month: Decimal,
    pub monthly_invoices: usize,
    pub last_month: Decimal,
    /// Percent change of this month over last month; `None` when last month is zero.
    pub revenue_growth: Option<Decimal>,
    pub total_clients: i64,
    pub active_clients: usize,
}

fn same_month(date: NaiveDate, year: i32, month: u32) -> bool {
    date.year() == year && date.month() == month
}

fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

/// Percent change rounded to one decimal place.
pub fn growth_percent(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    let change = (current - previous) / previous * Decimal::ONE_HUNDRED;
    Some(change.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
}

/// Aggregate an owner's invoices. Every call recomputes from scratch.
pub fn compute_dashboard_stats(
    invoices: &[Invoice],
    client_count: i64,
    today: NaiveDate,
) -> DashboardStats {
    let (last_year, last_month_no) = previous_month(today);
    let active_since = today - Duration::days(ACTIVE_CLIENT_WINDOW_DAYS - 1);

    let mut total_revenue = Decimal::ZERO;
    let mut outstanding = Decimal::ZERO;
    let mut outstanding_count = 0;
    let mut this_month = Decimal::ZERO;
    let mut monthly_invoices = 0;
    let mut last_month = Decimal::ZERO;
    let mut active: HashSet<Uuid> = HashSet::new();

    for invoice in invoices {
        let status = invoice.status();
        if status == InvoiceStatus::Paid {
            total_revenue += invoice.total;
        }
        if status.is_outstanding() {
            outstanding += invoice.total;
            outstanding_count += 1;
        }
        if same_month(invoice.issue_date, today.year(), today.month()) {
            this_month += invoice.total;
            monthly_invoices += 1;
        }
        if same_month(invoice.issue_date, last_year, last_month_no) {
            last_month += invoice.total;
        }
        if invoice.issue_date >= active_since && invoice.issue_date <= today {
            active.insert(invoice.client_id);
        }
    }

    DashboardStats {
        total_revenue,
        outstanding,
        outstanding_count,
        this_month,
        monthly_invoices,
        last_month,
        revenue_growth: growth_percent(this_month, last_month),
        total_clients: client_count,
        active_clients: active.len(),
    }
}
