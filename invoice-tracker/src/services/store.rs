//! Owner-scoped entity store abstraction.
//!
//! Every user-facing method takes the owner id first. A row that does not exist and a
//! row owned by someone else are indistinguishable to the caller: both come back as
//! `None` (or `false` for deletes), never as an error.

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Client, CreateClient, CreateExpense, CreateInvoice, CreateLineItem, Expense, Invoice,
    InvoiceAmounts, InvoiceWithClient, LineItem, UpdateClient, UpdateExpense, UpdateInvoice,
};

#[async_trait]
pub trait EntityStore: Send + Sync {
    // Clients
    async fn list_clients(&self, owner_id: Uuid) -> Result<Vec<Client>, AppError>;
    async fn get_client(&self, owner_id: Uuid, client_id: Uuid)
        -> Result<Option<Client>, AppError>;
    async fn create_client(&self, owner_id: Uuid, input: &CreateClient)
        -> Result<Client, AppError>;
    async fn update_client(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError>;
    async fn delete_client(&self, owner_id: Uuid, client_id: Uuid) -> Result<bool, AppError>;
    async fn count_clients(&self, owner_id: Uuid) -> Result<i64, AppError>;

    // Invoices

    /// Invoices joined with client and line items. Invoices whose client no longer
    /// exists are left out.
    async fn list_invoices(&self, owner_id: Uuid) -> Result<Vec<InvoiceWithClient>, AppError>;

    /// Raw invoice rows, including those with a dangling client reference.
    async fn list_invoice_records(&self, owner_id: Uuid) -> Result<Vec<Invoice>, AppError>;

    async fn get_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceWithClient>, AppError>;

    /// Persist an invoice and its line items as one unit. Fails with `NotFound` when the
    /// client is not the owner's and `Conflict` when the number is already taken.
    async fn create_invoice(
        &self,
        owner_id: Uuid,
        input: &CreateInvoice,
        line_items: &[CreateLineItem],
    ) -> Result<InvoiceWithClient, AppError>;

    async fn update_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError>;

    /// Remove line items, then the invoice. `false` when nothing was removed.
    async fn delete_invoice(&self, owner_id: Uuid, invoice_id: Uuid) -> Result<bool, AppError>;

    // Line items
    async fn get_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError>;

    /// Full replace of an invoice's line items together with its amounts.
    async fn replace_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        line_items: &[CreateLineItem],
        amounts: &InvoiceAmounts,
    ) -> Result<Option<Vec<LineItem>>, AppError>;

    // Expenses
    async fn list_expenses(&self, owner_id: Uuid) -> Result<Vec<Expense>, AppError>;
    async fn get_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Option<Expense>, AppError>;
    async fn create_expense(
        &self,
        owner_id: Uuid,
        input: &CreateExpense,
    ) -> Result<Expense, AppError>;
    async fn update_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
        input: &UpdateExpense,
    ) -> Result<Option<Expense>, AppError>;
    async fn delete_expense(&self, owner_id: Uuid, expense_id: Uuid) -> Result<bool, AppError>;

    // Scheduler

    /// Sent invoices across every owner, joined with client and line items.
    /// Only the reminder scheduler calls this; it is never reachable over HTTP.
    async fn list_reminder_candidates(&self) -> Result<Vec<InvoiceWithClient>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
