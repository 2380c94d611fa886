//! PostgreSQL entity store for invoice-tracker.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::{
    Client, CreateClient, CreateExpense, CreateInvoice, CreateLineItem, Expense, Invoice,
    InvoiceAmounts, InvoiceWithClient, LineItem, UpdateClient, UpdateExpense, UpdateInvoice,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::EntityStore;

const CLIENT_COLUMNS: &str =
    "client_id, owner_id, name, email, company, phone, address, billing_rate, created_utc";

const INVOICE_COLUMNS: &str = "invoice_id, owner_id, number, client_id, issue_date, due_date, \
     status, subtotal, tax, total, notes, email_sent, created_utc";

const LINE_ITEM_COLUMNS: &str =
    "line_item_id, invoice_id, owner_id, description, quantity, rate, total, sort_order";

/// Invoice writes are refused once the invoice's client is gone, matching the joined reads.
const CLIENT_RESOLVES: &str = "EXISTS (SELECT 1 FROM clients c \
     WHERE c.client_id = invoices.client_id AND c.owner_id = invoices.owner_id)";

const EXPENSE_COLUMNS: &str =
    "expense_id, owner_id, description, amount, category, date, receipt, created_utc";

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

/// Map an invoice write error, turning the per-owner number index into a conflict.
fn invoice_write_error(context: &str, number: &str, e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(anyhow::anyhow!("Invoice number '{}' already exists", number))
        }
        _ => db_error(context, e),
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-tracker"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Attach clients and line items to invoice rows.
    ///
    /// Invoices whose client is gone (or belongs to another owner) are dropped.
    async fn hydrate(&self, invoices: Vec<Invoice>) -> Result<Vec<InvoiceWithClient>, AppError> {
        if invoices.is_empty() {
            return Ok(Vec::new());
        }

        let client_ids: Vec<Uuid> = invoices.iter().map(|i| i.client_id).collect();
        let invoice_ids: Vec<Uuid> = invoices.iter().map(|i| i.invoice_id).collect();

        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = ANY($1)"
        ))
        .bind(&client_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load clients", e))?;

        let line_items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE invoice_id = ANY($1) \
             ORDER BY invoice_id, sort_order"
        ))
        .bind(&invoice_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load line items", e))?;

        let clients: HashMap<Uuid, Client> =
            clients.into_iter().map(|c| (c.client_id, c)).collect();
        let mut items_by_invoice: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for item in line_items {
            items_by_invoice.entry(item.invoice_id).or_default().push(item);
        }

        let mut result = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let client = match clients.get(&invoice.client_id) {
                Some(c) if c.owner_id == invoice.owner_id => c.clone(),
                _ => {
                    debug!(
                        invoice_id = %invoice.invoice_id,
                        client_id = %invoice.client_id,
                        "Skipping invoice with missing client"
                    );
                    continue;
                }
            };
            let line_items = items_by_invoice
                .remove(&invoice.invoice_id)
                .unwrap_or_default();
            result.push(InvoiceWithClient {
                invoice,
                client,
                line_items,
            });
        }

        Ok(result)
    }

    async fn insert_line_items(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: Uuid,
        invoice_id: Uuid,
        inputs: &[CreateLineItem],
    ) -> Result<Vec<LineItem>, AppError> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let item = sqlx::query_as::<_, LineItem>(&format!(
                r#"
                INSERT INTO line_items (line_item_id, invoice_id, owner_id, description, quantity, rate, total, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {LINE_ITEM_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(owner_id)
            .bind(&input.description)
            .bind(input.quantity)
            .bind(input.rate)
            .bind(input.total)
            .bind(input.sort_order)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| db_error("Failed to insert line item", e))?;
            created.push(item);
        }
        Ok(created)
    }
}

#[async_trait]
impl EntityStore for Database {
    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_clients(&self, owner_id: Uuid) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE owner_id = $1 ORDER BY created_utc"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list clients", e))?;

        timer.observe_duration();

        Ok(clients)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, client_id = %client_id))]
    async fn get_client(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE owner_id = $1 AND client_id = $2"
        ))
        .bind(owner_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get client", e))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id))]
    async fn create_client(
        &self,
        owner_id: Uuid,
        input: &CreateClient,
    ) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (client_id, owner_id, name, email, company, phone, address, billing_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.company)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.billing_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create client", e))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id, client_id = %client_id))]
    async fn update_client(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = COALESCE($3, name),
                email = COALESCE($4, email),
                company = COALESCE($5, company),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                billing_rate = COALESCE($8, billing_rate)
            WHERE owner_id = $1 AND client_id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.company)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.billing_rate)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update client", e))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, client_id = %client_id))]
    async fn delete_client(&self, owner_id: Uuid, client_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client"])
            .start_timer();

        let result = sqlx::query("DELETE FROM clients WHERE owner_id = $1 AND client_id = $2")
            .bind(owner_id)
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete client", e))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(client_id = %client_id, "Client deleted");
        }
        Ok(deleted)
    }

    async fn count_clients(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_clients"])
            .start_timer();

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count clients", e))?;

        timer.observe_duration();

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_invoices(&self, owner_id: Uuid) -> Result<Vec<InvoiceWithClient>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = self.list_invoice_records(owner_id).await?;
        let joined = self.hydrate(invoices).await?;

        timer.observe_duration();

        Ok(joined)
    }

    async fn list_invoice_records(&self, owner_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE owner_id = $1 ORDER BY created_utc DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list invoices", e))
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, invoice_id = %invoice_id))]
    async fn get_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceWithClient>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE owner_id = $1 AND invoice_id = $2"
        ))
        .bind(owner_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get invoice", e))?;

        let joined = match invoice {
            Some(invoice) => self.hydrate(vec![invoice]).await?.pop(),
            None => None,
        };

        timer.observe_duration();

        Ok(joined)
    }

    #[instrument(skip(self, input, line_items), fields(owner_id = %owner_id))]
    async fn create_invoice(
        &self,
        owner_id: Uuid,
        input: &CreateInvoice,
        line_items: &[CreateLineItem],
    ) -> Result<InvoiceWithClient, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE owner_id = $1 AND client_id = $2"
        ))
        .bind(owner_id)
        .bind(input.client_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to get client", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, owner_id, number, client_id, issue_date, due_date,
                status, subtotal, tax, total, notes, email_sent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, FALSE)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&input.number)
        .bind(input.client_id)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(input.status.as_str())
        .bind(input.amounts.subtotal)
        .bind(input.amounts.tax)
        .bind(input.amounts.total)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| invoice_write_error("Failed to create invoice", &input.number, e))?;

        let created =
            Self::insert_line_items(&mut tx, owner_id, invoice.invoice_id, line_items).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            number = %invoice.number,
            line_items = created.len(),
            "Invoice created"
        );

        Ok(InvoiceWithClient {
            invoice,
            client,
            line_items: created,
        })
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id, invoice_id = %invoice_id))]
    async fn update_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        if let Some(client_id) = input.client_id {
            if self.get_client(owner_id, client_id).await?.is_none() {
                return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
            }
        }

        let number = input.number.as_deref().unwrap_or_default();
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET number = COALESCE($3, number),
                client_id = COALESCE($4, client_id),
                issue_date = COALESCE($5, issue_date),
                due_date = COALESCE($6, due_date),
                status = COALESCE($7, status),
                notes = COALESCE($8, notes),
                email_sent = COALESCE($9, email_sent),
                subtotal = COALESCE($10, subtotal),
                tax = COALESCE($11, tax),
                total = COALESCE($12, total)
            WHERE owner_id = $1 AND invoice_id = $2 AND {CLIENT_RESOLVES}
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(invoice_id)
        .bind(&input.number)
        .bind(input.client_id)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(input.status.map(|s| s.as_str()))
        .bind(&input.notes)
        .bind(input.email_sent)
        .bind(input.subtotal)
        .bind(input.tax)
        .bind(input.total)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| invoice_write_error("Failed to update invoice", number, e))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, invoice_id = %invoice_id))]
    async fn delete_invoice(&self, owner_id: Uuid, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let removed_items =
            sqlx::query("DELETE FROM line_items WHERE owner_id = $1 AND invoice_id = $2")
                .bind(owner_id)
                .bind(invoice_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to delete line items", e))?
                .rows_affected();

        let result = sqlx::query("DELETE FROM invoices WHERE owner_id = $1 AND invoice_id = $2")
            .bind(owner_id)
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete invoice", e))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, line_items = removed_items, "Invoice deleted");
        }
        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Line Item Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(owner_id = %owner_id, invoice_id = %invoice_id))]
    async fn get_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_items"])
            .start_timer();

        let items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items \
             WHERE owner_id = $1 AND invoice_id = $2 ORDER BY sort_order"
        ))
        .bind(owner_id)
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get line items", e))?;

        timer.observe_duration();

        Ok(items)
    }

    #[instrument(
        skip(self, line_items, amounts),
        fields(owner_id = %owner_id, invoice_id = %invoice_id)
    )]
    async fn replace_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        line_items: &[CreateLineItem],
        amounts: &InvoiceAmounts,
    ) -> Result<Option<Vec<LineItem>>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_line_items"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Lock the invoice row so concurrent replacements serialize.
        let updated = sqlx::query(&format!(
            r#"
            UPDATE invoices
            SET subtotal = $3, tax = $4, total = $5
            WHERE owner_id = $1 AND invoice_id = $2 AND {CLIENT_RESOLVES}
            "#
        ))
        .bind(owner_id)
        .bind(invoice_id)
        .bind(amounts.subtotal)
        .bind(amounts.tax)
        .bind(amounts.total)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update invoice amounts", e))?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.ok();
            timer.observe_duration();
            return Ok(None);
        }

        sqlx::query("DELETE FROM line_items WHERE owner_id = $1 AND invoice_id = $2")
            .bind(owner_id)
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete line items", e))?;

        let created = Self::insert_line_items(&mut tx, owner_id, invoice_id, line_items).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        Ok(Some(created))
    }

    // -------------------------------------------------------------------------
    // Expense Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_expenses(&self, owner_id: Uuid) -> Result<Vec<Expense>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_expenses"])
            .start_timer();

        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE owner_id = $1 ORDER BY date DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list expenses", e))?;

        timer.observe_duration();

        Ok(expenses)
    }

    async fn get_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Option<Expense>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_expense"])
            .start_timer();

        let expense = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE owner_id = $1 AND expense_id = $2"
        ))
        .bind(owner_id)
        .bind(expense_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get expense", e))?;

        timer.observe_duration();

        Ok(expense)
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id))]
    async fn create_expense(
        &self,
        owner_id: Uuid,
        input: &CreateExpense,
    ) -> Result<Expense, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_expense"])
            .start_timer();

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses (expense_id, owner_id, description, amount, category, date, receipt)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&input.description)
        .bind(input.amount)
        .bind(&input.category)
        .bind(input.date)
        .bind(&input.receipt)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create expense", e))?;

        timer.observe_duration();

        info!(expense_id = %expense.expense_id, "Expense logged");

        Ok(expense)
    }

    async fn update_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
        input: &UpdateExpense,
    ) -> Result<Option<Expense>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_expense"])
            .start_timer();

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses
            SET description = COALESCE($3, description),
                amount = COALESCE($4, amount),
                category = COALESCE($5, category),
                date = COALESCE($6, date),
                receipt = COALESCE($7, receipt)
            WHERE owner_id = $1 AND expense_id = $2
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(expense_id)
        .bind(&input.description)
        .bind(input.amount)
        .bind(&input.category)
        .bind(input.date)
        .bind(&input.receipt)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update expense", e))?;

        timer.observe_duration();

        Ok(expense)
    }

    async fn delete_expense(&self, owner_id: Uuid, expense_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_expense"])
            .start_timer();

        let result = sqlx::query("DELETE FROM expenses WHERE owner_id = $1 AND expense_id = $2")
            .bind(owner_id)
            .bind(expense_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete expense", e))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Scheduler
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_reminder_candidates(&self) -> Result<Vec<InvoiceWithClient>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_reminder_candidates"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = 'sent' ORDER BY due_date"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list reminder candidates", e))?;

        let joined = self.hydrate(invoices).await?;

        timer.observe_duration();

        Ok(joined)
    }

    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}
