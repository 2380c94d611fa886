//! Which sent invoices qualify for a reminder on a given day.

use chrono::{Duration, NaiveDate};

use crate::models::{Invoice, InvoiceStatus, InvoiceWithClient};
use crate::services::mailer::ReminderKind;

/// Invoices due within this many days of today get a due-soon reminder.
pub const DUE_SOON_WINDOW_DAYS: i64 = 3;

/// Sent, and due after today but no later than the end of the window.
pub fn is_due_soon(invoice: &Invoice, today: NaiveDate) -> bool {
    invoice.status() == InvoiceStatus::Sent
        && invoice.due_date > today
        && invoice.due_date <= today + Duration::days(DUE_SOON_WINDOW_DAYS)
}

/// Sent, and due before today.
pub fn is_overdue(invoice: &Invoice, today: NaiveDate) -> bool {
    invoice.status() == InvoiceStatus::Sent && invoice.due_date < today
}

pub fn is_eligible(invoice: &Invoice, kind: ReminderKind, today: NaiveDate) -> bool {
    match kind {
        ReminderKind::DueSoon => is_due_soon(invoice, today),
        ReminderKind::Overdue => is_overdue(invoice, today),
    }
}

pub fn select_reminders(
    invoices: &[InvoiceWithClient],
    kind: ReminderKind,
    today: NaiveDate,
) -> Vec<&InvoiceWithClient> {
    invoices
        .iter()
        .filter(|i| is_eligible(&i.invoice, kind, today))
        .collect()
}
