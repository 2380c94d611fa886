//! Billing operations behind the HTTP handlers.
//!
//! Inputs arrive already parsed and validated for shape; this layer applies the
//! business rules (totals, non-empty invoices, uniform not-found) and talks to the
//! store, renderer and dispatcher.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Client, CreateClient, CreateExpense, CreateInvoice, Expense, Invoice, InvoiceStatus,
    InvoiceWithClient, LineItem, UpdateClient, UpdateExpense, UpdateInvoice,
};
use crate::services::dashboard::{compute_dashboard_stats, DashboardStats};
use crate::services::mailer::NotificationDispatcher;
use crate::services::metrics::{INVOICES_CREATED_TOTAL, NOTIFICATIONS_TOTAL};
use crate::services::renderer::{DocumentRenderer, RenderedDocument};
use crate::services::store::EntityStore;
use crate::services::totals::{
    compute_invoice_totals, fits_money_column, InvoiceTotals, LineItemInput,
};

fn not_found(entity: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("{} not found", entity))
}

/// Reject totals that would overflow the stored amount columns.
fn ensure_storable(totals: &InvoiceTotals) -> Result<(), AppError> {
    let line_amounts = totals.line_items.iter().map(|item| item.total);
    let amounts = [
        totals.amounts.subtotal,
        totals.amounts.tax,
        totals.amounts.total,
    ];
    if line_amounts.chain(amounts).all(fits_money_column) {
        Ok(())
    } else {
        Err(AppError::BadRequest(anyhow::anyhow!(
            "Invoice amounts exceed the largest storable total"
        )))
    }
}

/// Invoice as submitted: header fields plus raw line items.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub number: String,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub line_items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendInvoiceOutcome {
    pub invoice_id: Uuid,
    pub email_sent: bool,
}

#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn EntityStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    renderer: Arc<dyn DocumentRenderer>,
    tax_rate: Decimal,
}

impl BillingService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        renderer: Arc<dyn DocumentRenderer>,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            store,
            dispatcher,
            renderer,
            tax_rate,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    pub async fn list_clients(&self, owner_id: Uuid) -> Result<Vec<Client>, AppError> {
        self.store.list_clients(owner_id).await
    }

    pub async fn get_client(&self, owner_id: Uuid, client_id: Uuid) -> Result<Client, AppError> {
        self.store
            .get_client(owner_id, client_id)
            .await?
            .ok_or_else(|| not_found("Client"))
    }

    pub async fn create_client(
        &self,
        owner_id: Uuid,
        input: CreateClient,
    ) -> Result<Client, AppError> {
        self.store.create_client(owner_id, &input).await
    }

    pub async fn update_client(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
        input: UpdateClient,
    ) -> Result<Client, AppError> {
        self.store
            .update_client(owner_id, client_id, &input)
            .await?
            .ok_or_else(|| not_found("Client"))
    }

    pub async fn delete_client(&self, owner_id: Uuid, client_id: Uuid) -> Result<(), AppError> {
        if self.store.delete_client(owner_id, client_id).await? {
            Ok(())
        } else {
            Err(not_found("Client"))
        }
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    pub async fn list_invoices(&self, owner_id: Uuid) -> Result<Vec<InvoiceWithClient>, AppError> {
        self.store.list_invoices(owner_id).await
    }

    pub async fn get_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceWithClient, AppError> {
        self.store
            .get_invoice(owner_id, invoice_id)
            .await?
            .ok_or_else(|| not_found("Invoice"))
    }

    /// Compute totals from the submitted line items and persist everything at once.
    #[instrument(skip(self, input), fields(owner_id = %owner_id, number = %input.number))]
    pub async fn create_invoice(
        &self,
        owner_id: Uuid,
        input: NewInvoice,
    ) -> Result<InvoiceWithClient, AppError> {
        if input.line_items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "An invoice needs at least one line item"
            )));
        }

        let totals = compute_invoice_totals(&input.line_items, self.tax_rate);
        ensure_storable(&totals)?;
        let header = CreateInvoice {
            number: input.number,
            client_id: input.client_id,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: input.status,
            notes: input.notes,
            amounts: totals.amounts,
        };

        let created = self
            .store
            .create_invoice(owner_id, &header, &totals.to_create_line_items())
            .await?;

        INVOICES_CREATED_TOTAL
            .with_label_values(&[header.status.as_str()])
            .inc();

        Ok(created)
    }

    /// Partial update of header fields. Amounts are not recomputed here.
    pub async fn update_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        input: UpdateInvoice,
    ) -> Result<Invoice, AppError> {
        self.store
            .update_invoice(owner_id, invoice_id, &input)
            .await?
            .ok_or_else(|| not_found("Invoice"))
    }

    pub async fn delete_invoice(&self, owner_id: Uuid, invoice_id: Uuid) -> Result<(), AppError> {
        if self.store.delete_invoice(owner_id, invoice_id).await? {
            Ok(())
        } else {
            Err(not_found("Invoice"))
        }
    }

    // -------------------------------------------------------------------------
    // Line items
    // -------------------------------------------------------------------------

    pub async fn get_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        Ok(self.get_invoice(owner_id, invoice_id).await?.line_items)
    }

    /// Replace the whole line item set and recompute the invoice amounts.
    #[instrument(skip(self, items), fields(owner_id = %owner_id, invoice_id = %invoice_id))]
    pub async fn replace_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        items: Vec<LineItemInput>,
    ) -> Result<InvoiceWithClient, AppError> {
        if items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "An invoice needs at least one line item"
            )));
        }

        let totals = compute_invoice_totals(&items, self.tax_rate);
        ensure_storable(&totals)?;
        self.store
            .replace_line_items(
                owner_id,
                invoice_id,
                &totals.to_create_line_items(),
                &totals.amounts,
            )
            .await?
            .ok_or_else(|| not_found("Invoice"))?;

        self.get_invoice(owner_id, invoice_id).await
    }

    // -------------------------------------------------------------------------
    // Documents and notices
    // -------------------------------------------------------------------------

    pub async fn render_document(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<RenderedDocument, AppError> {
        let invoice = self.get_invoice(owner_id, invoice_id).await?;
        Ok(self.renderer.render_invoice(&invoice))
    }

    /// Email the invoice to its client. A delivery failure is reported in the
    /// outcome, not as an error. On success the invoice is flagged as emailed and a
    /// draft becomes sent.
    #[instrument(skip(self), fields(owner_id = %owner_id, invoice_id = %invoice_id))]
    pub async fn send_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<SendInvoiceOutcome, AppError> {
        let invoice = self.get_invoice(owner_id, invoice_id).await?;

        if !self.dispatcher.is_configured() {
            NOTIFICATIONS_TOTAL
                .with_label_values(&["invoice", "skipped"])
                .inc();
        }

        let document = self.renderer.render_invoice(&invoice);
        let delivered = self
            .dispatcher
            .send_invoice_notice(&invoice, &document)
            .await;

        if !delivered {
            if self.dispatcher.is_configured() {
                NOTIFICATIONS_TOTAL
                    .with_label_values(&["invoice", "failed"])
                    .inc();
            }
            warn!(number = %invoice.invoice.number, "Invoice email not delivered");
            return Ok(SendInvoiceOutcome {
                invoice_id,
                email_sent: false,
            });
        }

        NOTIFICATIONS_TOTAL
            .with_label_values(&["invoice", "sent"])
            .inc();

        let status =
            (invoice.invoice.status() == InvoiceStatus::Draft).then_some(InvoiceStatus::Sent);
        self.store
            .update_invoice(
                owner_id,
                invoice_id,
                &UpdateInvoice {
                    email_sent: Some(true),
                    status,
                    ..UpdateInvoice::default()
                },
            )
            .await?;

        info!(number = %invoice.invoice.number, "Invoice emailed");

        Ok(SendInvoiceOutcome {
            invoice_id,
            email_sent: true,
        })
    }

    // -------------------------------------------------------------------------
    // Expenses
    // -------------------------------------------------------------------------

    pub async fn list_expenses(&self, owner_id: Uuid) -> Result<Vec<Expense>, AppError> {
        self.store.list_expenses(owner_id).await
    }

    pub async fn get_expense(&self, owner_id: Uuid, expense_id: Uuid) -> Result<Expense, AppError> {
        self.store
            .get_expense(owner_id, expense_id)
            .await?
            .ok_or_else(|| not_found("Expense"))
    }

    pub async fn create_expense(
        &self,
        owner_id: Uuid,
        input: CreateExpense,
    ) -> Result<Expense, AppError> {
        self.store.create_expense(owner_id, &input).await
    }

    pub async fn update_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
        input: UpdateExpense,
    ) -> Result<Expense, AppError> {
        self.store
            .update_expense(owner_id, expense_id, &input)
            .await?
            .ok_or_else(|| not_found("Expense"))
    }

    pub async fn delete_expense(&self, owner_id: Uuid, expense_id: Uuid) -> Result<(), AppError> {
        if self.store.delete_expense(owner_id, expense_id).await? {
            Ok(())
        } else {
            Err(not_found("Expense"))
        }
    }

    // -------------------------------------------------------------------------
    // Dashboard
    // -------------------------------------------------------------------------

    /// Statistics as of today's local date.
    pub async fn dashboard(&self, owner_id: Uuid) -> Result<DashboardStats, AppError> {
        self.dashboard_on(owner_id, Local::now().date_naive()).await
    }

    pub async fn dashboard_on(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<DashboardStats, AppError> {
        let invoices = self.store.list_invoice_records(owner_id).await?;
        let client_count = self.store.count_clients(owner_id).await?;
        Ok(compute_dashboard_stats(&invoices, client_count, today))
    }
}
