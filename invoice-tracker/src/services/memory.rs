//! In-process entity store.
//!
//! Backs tests and local runs without PostgreSQL. All tables sit behind one
//! `RwLock`, so multi-row writes (invoice + line items) are applied atomically:
//! every check happens before the first mutation.

use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::{
    Client, CreateClient, CreateExpense, CreateInvoice, CreateLineItem, Expense, Invoice,
    InvoiceAmounts, InvoiceStatus, InvoiceWithClient, LineItem, UpdateClient, UpdateExpense,
    UpdateInvoice,
};
use crate::services::store::EntityStore;

#[derive(Default)]
struct Tables {
    clients: HashMap<Uuid, Client>,
    invoices: HashMap<Uuid, Invoice>,
    line_items: HashMap<Uuid, LineItem>,
    expenses: HashMap<Uuid, Expense>,
}

impl Tables {
    fn owned_client(&self, owner_id: Uuid, client_id: Uuid) -> Option<&Client> {
        self.clients
            .get(&client_id)
            .filter(|c| c.owner_id == owner_id)
    }

    fn owned_invoice(&self, owner_id: Uuid, invoice_id: Uuid) -> Option<&Invoice> {
        self.invoices
            .get(&invoice_id)
            .filter(|i| i.owner_id == owner_id)
    }

    /// An owned invoice whose client still resolves. Writes only go through this.
    fn writable_invoice(&self, owner_id: Uuid, invoice_id: Uuid) -> Option<&Invoice> {
        self.owned_invoice(owner_id, invoice_id)
            .filter(|i| self.owned_client(owner_id, i.client_id).is_some())
    }

    fn line_items_for(&self, invoice_id: Uuid) -> Vec<LineItem> {
        let mut items: Vec<LineItem> = self
            .line_items
            .values()
            .filter(|item| item.invoice_id == invoice_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.sort_order);
        items
    }

    /// Join an invoice with its client (same owner) and line items.
    fn join(&self, invoice: &Invoice) -> Option<InvoiceWithClient> {
        let client = self.owned_client(invoice.owner_id, invoice.client_id)?;
        Some(InvoiceWithClient {
            invoice: invoice.clone(),
            client: client.clone(),
            line_items: self.line_items_for(invoice.invoice_id),
        })
    }

    fn number_taken(&self, owner_id: Uuid, number: &str, except: Option<Uuid>) -> bool {
        self.invoices.values().any(|i| {
            i.owner_id == owner_id && i.number == number && Some(i.invoice_id) != except
        })
    }

    fn remove_line_items(&mut self, invoice_id: Uuid) -> usize {
        let before = self.line_items.len();
        self.line_items.retain(|_, item| item.invoice_id != invoice_id);
        before - self.line_items.len()
    }

    fn insert_line_items(
        &mut self,
        owner_id: Uuid,
        invoice_id: Uuid,
        inputs: &[CreateLineItem],
    ) -> Vec<LineItem> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let item = LineItem {
                line_item_id: Uuid::new_v4(),
                invoice_id,
                owner_id,
                description: input.description.clone(),
                quantity: input.quantity,
                rate: input.rate,
                total: input.total,
                sort_order: input.sort_order,
            };
            self.line_items.insert(item.line_item_id, item.clone());
            created.push(item);
        }
        created.sort_by_key(|item| item.sort_order);
        created
    }
}

fn duplicate_number(number: &str) -> AppError {
    AppError::Conflict(anyhow::anyhow!(
        "Invoice number '{}' already exists",
        number
    ))
}

/// Entity store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    async fn list_clients(&self, owner_id: Uuid) -> Result<Vec<Client>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_client(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.owned_client(owner_id, client_id).cloned())
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id))]
    async fn create_client(
        &self,
        owner_id: Uuid,
        input: &CreateClient,
    ) -> Result<Client, AppError> {
        let client = Client {
            client_id: Uuid::new_v4(),
            owner_id,
            name: input.name.clone(),
            email: input.email.clone(),
            company: input.company.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            billing_rate: input.billing_rate,
            created_utc: Utc::now(),
        };

        self.tables
            .write()
            .await
            .clients
            .insert(client.client_id, client.clone());

        info!(client_id = %client.client_id, "Client created");
        Ok(client)
    }

    async fn update_client(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(client) = tables
            .clients
            .get_mut(&client_id)
            .filter(|c| c.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if let Some(name) = &input.name {
            client.name = name.clone();
        }
        if let Some(email) = &input.email {
            client.email = email.clone();
        }
        if let Some(company) = &input.company {
            client.company = Some(company.clone());
        }
        if let Some(phone) = &input.phone {
            client.phone = Some(phone.clone());
        }
        if let Some(address) = &input.address {
            client.address = Some(address.clone());
        }
        if let Some(rate) = input.billing_rate {
            client.billing_rate = Some(rate);
        }

        Ok(Some(client.clone()))
    }

    async fn delete_client(&self, owner_id: Uuid, client_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.owned_client(owner_id, client_id).is_none() {
            return Ok(false);
        }
        tables.clients.remove(&client_id);
        info!(client_id = %client_id, "Client deleted");
        Ok(true)
    }

    async fn count_clients(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .values()
            .filter(|c| c.owner_id == owner_id)
            .count() as i64)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    async fn list_invoices(&self, owner_id: Uuid) -> Result<Vec<InvoiceWithClient>, AppError> {
        let tables = self.tables.read().await;
        let mut result = Vec::new();
        for invoice in tables.invoices.values().filter(|i| i.owner_id == owner_id) {
            match tables.join(invoice) {
                Some(joined) => result.push(joined),
                None => debug!(
                    invoice_id = %invoice.invoice_id,
                    client_id = %invoice.client_id,
                    "Skipping invoice with missing client"
                ),
            }
        }
        Ok(result)
    }

    async fn list_invoice_records(&self, owner_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .invoices
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceWithClient>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .owned_invoice(owner_id, invoice_id)
            .and_then(|invoice| tables.join(invoice)))
    }

    #[instrument(skip(self, input, line_items), fields(owner_id = %owner_id))]
    async fn create_invoice(
        &self,
        owner_id: Uuid,
        input: &CreateInvoice,
        line_items: &[CreateLineItem],
    ) -> Result<InvoiceWithClient, AppError> {
        let mut tables = self.tables.write().await;

        let client = tables
            .owned_client(owner_id, input.client_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        if tables.number_taken(owner_id, &input.number, None) {
            return Err(duplicate_number(&input.number));
        }

        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            owner_id,
            number: input.number.clone(),
            client_id: input.client_id,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: input.status.as_str().to_string(),
            subtotal: input.amounts.subtotal,
            tax: input.amounts.tax,
            total: input.amounts.total,
            notes: input.notes.clone(),
            email_sent: false,
            created_utc: Utc::now(),
        };
        tables.invoices.insert(invoice.invoice_id, invoice.clone());
        let created = tables.insert_line_items(owner_id, invoice.invoice_id, line_items);

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

    async fn update_invoice(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let mut tables = self.tables.write().await;
        if tables.writable_invoice(owner_id, invoice_id).is_none() {
            return Ok(None);
        }

        if let Some(number) = &input.number {
            if tables.number_taken(owner_id, number, Some(invoice_id)) {
                return Err(duplicate_number(number));
            }
        }
        if let Some(client_id) = input.client_id {
            if tables.owned_client(owner_id, client_id).is_none() {
                return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
            }
        }

        let Some(invoice) = tables.invoices.get_mut(&invoice_id) else {
            return Ok(None);
        };

        if let Some(number) = &input.number {
            invoice.number = number.clone();
        }
        if let Some(client_id) = input.client_id {
            invoice.client_id = client_id;
        }
        if let Some(issue_date) = input.issue_date {
            invoice.issue_date = issue_date;
        }
        if let Some(due_date) = input.due_date {
            invoice.due_date = due_date;
        }
        if let Some(status) = input.status {
            invoice.status = status.as_str().to_string();
        }
        if let Some(notes) = &input.notes {
            invoice.notes = Some(notes.clone());
        }
        if let Some(email_sent) = input.email_sent {
            invoice.email_sent = email_sent;
        }
        if let Some(subtotal) = input.subtotal {
            invoice.subtotal = subtotal;
        }
        if let Some(tax) = input.tax {
            invoice.tax = tax;
        }
        if let Some(total) = input.total {
            invoice.total = total;
        }

        Ok(Some(invoice.clone()))
    }

    async fn delete_invoice(&self, owner_id: Uuid, invoice_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.owned_invoice(owner_id, invoice_id).is_none() {
            return Ok(false);
        }

        let removed_items = tables.remove_line_items(invoice_id);
        tables.invoices.remove(&invoice_id);

        info!(invoice_id = %invoice_id, line_items = removed_items, "Invoice deleted");
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Line Item Operations
    // -------------------------------------------------------------------------

    async fn get_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        let tables = self.tables.read().await;
        if tables.owned_invoice(owner_id, invoice_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(tables.line_items_for(invoice_id))
    }

    async fn replace_line_items(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        line_items: &[CreateLineItem],
        amounts: &InvoiceAmounts,
    ) -> Result<Option<Vec<LineItem>>, AppError> {
        let mut tables = self.tables.write().await;
        if tables.writable_invoice(owner_id, invoice_id).is_none() {
            return Ok(None);
        }

        tables.remove_line_items(invoice_id);
        let created = tables.insert_line_items(owner_id, invoice_id, line_items);

        if let Some(invoice) = tables.invoices.get_mut(&invoice_id) {
            invoice.subtotal = amounts.subtotal;
            invoice.tax = amounts.tax;
            invoice.total = amounts.total;
        }

        Ok(Some(created))
    }

    // -------------------------------------------------------------------------
    // Expense Operations
    // -------------------------------------------------------------------------

    async fn list_expenses(&self, owner_id: Uuid) -> Result<Vec<Expense>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .expenses
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Option<Expense>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .expenses
            .get(&expense_id)
            .filter(|e| e.owner_id == owner_id)
            .cloned())
    }

    async fn create_expense(
        &self,
        owner_id: Uuid,
        input: &CreateExpense,
    ) -> Result<Expense, AppError> {
        let expense = Expense {
            expense_id: Uuid::new_v4(),
            owner_id,
            description: input.description.clone(),
            amount: input.amount,
            category: input.category.clone(),
            date: input.date,
            receipt: input.receipt.clone(),
            created_utc: Utc::now(),
        };

        self.tables
            .write()
            .await
            .expenses
            .insert(expense.expense_id, expense.clone());

        info!(expense_id = %expense.expense_id, "Expense logged");
        Ok(expense)
    }

    async fn update_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
        input: &UpdateExpense,
    ) -> Result<Option<Expense>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(expense) = tables
            .expenses
            .get_mut(&expense_id)
            .filter(|e| e.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if let Some(description) = &input.description {
            expense.description = description.clone();
        }
        if let Some(amount) = input.amount {
            expense.amount = amount;
        }
        if let Some(category) = &input.category {
            expense.category = category.clone();
        }
        if let Some(date) = input.date {
            expense.date = date;
        }
        if let Some(receipt) = &input.receipt {
            expense.receipt = Some(receipt.clone());
        }

        Ok(Some(expense.clone()))
    }

    async fn delete_expense(&self, owner_id: Uuid, expense_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .expenses
            .get(&expense_id)
            .is_some_and(|e| e.owner_id == owner_id);
        if owned {
            tables.expenses.remove(&expense_id);
        }
        Ok(owned)
    }

    // -------------------------------------------------------------------------
    // Scheduler
    // -------------------------------------------------------------------------

    async fn list_reminder_candidates(&self) -> Result<Vec<InvoiceWithClient>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .invoices
            .values()
            .filter(|i| i.status() == InvoiceStatus::Sent)
            .filter_map(|i| tables.join(i))
            .collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_client(name: &str) -> CreateClient {
        CreateClient {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            company: None,
            phone: None,
            address: None,
            billing_rate: None,
        }
    }

    fn new_invoice(number: &str, client_id: Uuid, status: InvoiceStatus) -> CreateInvoice {
        CreateInvoice {
            number: number.to_string(),
            client_id,
            issue_date: date("2026-10-01"),
            due_date: date("2026-10-31"),
            status,
            notes: None,
            amounts: InvoiceAmounts {
                subtotal: Decimal::new(2500, 2),
                tax: Decimal::new(213, 2),
                total: Decimal::new(2713, 2),
            },
        }
    }

    fn items() -> Vec<CreateLineItem> {
        vec![
            CreateLineItem {
                description: "A".to_string(),
                quantity: Decimal::from(2),
                rate: Decimal::from(10),
                total: Decimal::new(2000, 2),
                sort_order: 0,
            },
            CreateLineItem {
                description: "B".to_string(),
                quantity: Decimal::from(1),
                rate: Decimal::from(5),
                total: Decimal::new(500, 2),
                sort_order: 1,
            },
        ]
    }

    #[tokio::test]
    async fn delete_invoice_cascades_and_is_idempotent() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let client = store.create_client(owner, &new_client("Acme")).await.unwrap();
        let created = store
            .create_invoice(
                owner,
                &new_invoice("INV-1", client.client_id, InvoiceStatus::Draft),
                &items(),
            )
            .await
            .unwrap();
        let id = created.invoice.invoice_id;

        assert_eq!(store.get_line_items(owner, id).await.unwrap().len(), 2);
        assert!(store.delete_invoice(owner, id).await.unwrap());
        assert!(store.get_line_items(owner, id).await.unwrap().is_empty());
        assert!(store.tables.read().await.line_items.is_empty());
        assert!(!store.delete_invoice(owner, id).await.unwrap());
    }

    #[tokio::test]
    async fn create_invoice_for_foreign_client_writes_nothing() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let client = store.create_client(stranger, &new_client("Other")).await.unwrap();

        let err = store
            .create_invoice(
                owner,
                &new_invoice("INV-1", client.client_id, InvoiceStatus::Draft),
                &items(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        let tables = store.tables.read().await;
        assert!(tables.invoices.is_empty());
        assert!(tables.line_items.is_empty());
    }

    #[tokio::test]
    async fn invoice_numbers_are_unique_per_owner_only() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let a_client = store.create_client(alice, &new_client("A")).await.unwrap();
        let b_client = store.create_client(bob, &new_client("B")).await.unwrap();

        store
            .create_invoice(
                alice,
                &new_invoice("INV-001", a_client.client_id, InvoiceStatus::Sent),
                &items(),
            )
            .await
            .unwrap();
        store
            .create_invoice(
                bob,
                &new_invoice("INV-001", b_client.client_id, InvoiceStatus::Sent),
                &items(),
            )
            .await
            .unwrap();

        let dup = store
            .create_invoice(
                alice,
                &new_invoice("INV-001", a_client.client_id, InvoiceStatus::Sent),
                &items(),
            )
            .await
            .unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));

        let alice_invoices = store.list_invoices(alice).await.unwrap();
        assert_eq!(alice_invoices.len(), 1);
        assert_eq!(alice_invoices[0].client.client_id, a_client.client_id);
    }

    #[tokio::test]
    async fn dangling_client_hides_invoice_from_joined_reads() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let client = store.create_client(owner, &new_client("Gone")).await.unwrap();
        let created = store
            .create_invoice(
                owner,
                &new_invoice("INV-9", client.client_id, InvoiceStatus::Sent),
                &items(),
            )
            .await
            .unwrap();

        assert!(store.delete_client(owner, client.client_id).await.unwrap());

        assert!(store.list_invoices(owner).await.unwrap().is_empty());
        assert!(store
            .get_invoice(owner, created.invoice.invoice_id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.list_invoice_records(owner).await.unwrap().len(), 1);
        assert!(store.list_reminder_candidates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dangling_client_refuses_invoice_writes() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let client = store.create_client(owner, &new_client("Gone")).await.unwrap();
        let created = store
            .create_invoice(
                owner,
                &new_invoice("INV-9", client.client_id, InvoiceStatus::Sent),
                &items(),
            )
            .await
            .unwrap();
        let id = created.invoice.invoice_id;
        store.delete_client(owner, client.client_id).await.unwrap();

        let replaced = store
            .replace_line_items(owner, id, &items()[..1], &InvoiceAmounts::default())
            .await
            .unwrap();
        assert!(replaced.is_none());

        let update = UpdateInvoice {
            status: Some(InvoiceStatus::Paid),
            ..UpdateInvoice::default()
        };
        assert!(store.update_invoice(owner, id, &update).await.unwrap().is_none());

        let tables = store.tables.read().await;
        let invoice = &tables.invoices[&id];
        assert_eq!(invoice.status, "sent");
        assert_eq!(invoice.total, Decimal::new(2713, 2));
        assert_eq!(tables.line_items_for(id).len(), 2);
    }

    #[tokio::test]
    async fn replace_line_items_swaps_the_whole_set() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let client = store.create_client(owner, &new_client("Acme")).await.unwrap();
        let created = store
            .create_invoice(
                owner,
                &new_invoice("INV-2", client.client_id, InvoiceStatus::Draft),
                &items(),
            )
            .await
            .unwrap();
        let id = created.invoice.invoice_id;

        let replacement = vec![CreateLineItem {
            description: "C".to_string(),
            quantity: Decimal::from(3),
            rate: Decimal::from(100),
            total: Decimal::new(30000, 2),
            sort_order: 0,
        }];
        let amounts = InvoiceAmounts {
            subtotal: Decimal::new(30000, 2),
            tax: Decimal::new(2550, 2),
            total: Decimal::new(32550, 2),
        };

        let replaced = store
            .replace_line_items(owner, id, &replacement, &amounts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replaced.len(), 1);

        let fetched = store.get_invoice(owner, id).await.unwrap().unwrap();
        assert_eq!(fetched.line_items.len(), 1);
        assert_eq!(fetched.line_items[0].description, "C");
        assert_eq!(fetched.invoice.total, Decimal::new(32550, 2));

        let foreign = store
            .replace_line_items(Uuid::new_v4(), id, &replacement, &amounts)
            .await
            .unwrap();
        assert!(foreign.is_none());
    }

    #[tokio::test]
    async fn reminder_candidates_span_owners_and_only_sent() {
        let store = MemoryStore::new();
        let mut expected = Vec::new();
        for n in 0..2 {
            let owner = Uuid::new_v4();
            let client = store.create_client(owner, &new_client("C")).await.unwrap();
            let sent = store
                .create_invoice(
                    owner,
                    &new_invoice(&format!("S-{n}"), client.client_id, InvoiceStatus::Sent),
                    &items(),
                )
                .await
                .unwrap();
            expected.push(sent.invoice.invoice_id);
            store
                .create_invoice(
                    owner,
                    &new_invoice(&format!("P-{n}"), client.client_id, InvoiceStatus::Paid),
                    &items(),
                )
                .await
                .unwrap();
        }

        let mut found: Vec<Uuid> = store
            .list_reminder_candidates()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.invoice.invoice_id)
            .collect();
        found.sort();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn foreign_owner_sees_nothing() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let client = store.create_client(owner, &new_client("Acme")).await.unwrap();
        let expense = store
            .create_expense(
                owner,
                &CreateExpense {
                    description: "Laptop".to_string(),
                    amount: Decimal::from(1200),
                    category: "equipment".to_string(),
                    date: date("2026-10-02"),
                    receipt: None,
                },
            )
            .await
            .unwrap();

        assert!(store.get_client(intruder, client.client_id).await.unwrap().is_none());
        assert!(store
            .update_client(intruder, client.client_id, &UpdateClient::default())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_client(intruder, client.client_id).await.unwrap());
        assert!(store.get_expense(intruder, expense.expense_id).await.unwrap().is_none());
        assert!(!store.delete_expense(intruder, expense.expense_id).await.unwrap());
        assert!(store.list_clients(intruder).await.unwrap().is_empty());
        assert_eq!(store.count_clients(owner).await.unwrap(), 1);
    }
}
