//! Domain models for invoice-tracker.

mod client;
mod expense;
mod invoice;
mod line_item;

pub use client::{Client, CreateClient, UpdateClient};
pub use expense::{CreateExpense, Expense, UpdateExpense};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceAmounts, InvoiceStatus, InvoiceWithClient, UpdateInvoice,
};
pub use line_item::{CreateLineItem, LineItem};
