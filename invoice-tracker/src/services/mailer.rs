//! Outbound invoice email: reminders and invoice notices.
//!
//! Mail is an optional capability. `dispatcher_from_config` decides once at startup
//! whether the service talks SMTP or runs with a dispatcher that declines every send.
//! Dispatch methods never fail the caller: problems are logged and reported as `false`.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SmtpConfig;
use crate::models::InvoiceWithClient;
use crate::services::renderer::{escape_html, format_currency, RenderedDocument};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::EmailError(err.to_string())
    }
}

/// Which reminder an invoice qualifies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    DueSoon,
    Overdue,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::DueSoon => "due_soon",
            ReminderKind::Overdue => "overdue",
        }
    }
}

/// A composed email, independent of transport.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
    pub attachment: Option<RenderedDocument>,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_reminder(&self, invoice: &InvoiceWithClient, kind: ReminderKind) -> bool;

    /// Email the invoice itself, with `document` attached.
    async fn send_invoice_notice(
        &self,
        invoice: &InvoiceWithClient,
        document: &RenderedDocument,
    ) -> bool;

    fn is_configured(&self) -> bool;
}

// -----------------------------------------------------------------------------
// Templates
// -----------------------------------------------------------------------------

fn due_date_text(invoice: &InvoiceWithClient) -> String {
    invoice.invoice.due_date.format("%B %-d, %Y").to_string()
}

fn line_items_text(invoice: &InvoiceWithClient) -> String {
    invoice
        .line_items
        .iter()
        .map(|item| {
            format!(
                "  - {} ({} x {}): {}",
                item.description,
                item.quantity.normalize(),
                format_currency(item.rate),
                format_currency(item.total)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn line_items_html(invoice: &InvoiceWithClient) -> String {
    if invoice.line_items.is_empty() {
        return String::new();
    }
    let rows: String = invoice
        .line_items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:right\">{}</td><td style=\"text-align:right\">{}</td></tr>",
                escape_html(&item.description),
                item.quantity.normalize(),
                format_currency(item.rate),
                format_currency(item.total)
            )
        })
        .collect();
    format!(
        "<h3>Services Provided</h3><table style=\"width:100%;border-collapse:collapse\">{}</table>",
        rows
    )
}

pub fn reminder_subject(number: &str, kind: ReminderKind) -> String {
    match kind {
        ReminderKind::DueSoon => format!("Payment Reminder: Invoice #{} Due Soon", number),
        ReminderKind::Overdue => format!("Overdue Payment Notice: Invoice #{}", number),
    }
}

pub fn invoice_subject(number: &str, business_name: &str) -> String {
    format!("Invoice #{} from {}", number, business_name)
}

/// Compose a due-soon or overdue reminder.
pub fn reminder_email(
    invoice: &InvoiceWithClient,
    kind: ReminderKind,
    business_name: &str,
) -> EmailMessage {
    let number = &invoice.invoice.number;
    let amount = format_currency(invoice.invoice.total);
    let due = due_date_text(invoice);
    let (heading, lead, closing, accent) = match kind {
        ReminderKind::DueSoon => (
            "Payment Reminder",
            format!(
                "This is a friendly reminder that your payment for Invoice #{} is due soon.",
                number
            ),
            "Please ensure payment is made by the due date to avoid any late fees.",
            "#ea580c",
        ),
        ReminderKind::Overdue => (
            "Overdue Payment Notice",
            format!(
                "This is a notice that your payment for Invoice #{} is now overdue.",
                number
            ),
            "Please arrange payment as soon as possible.",
            "#dc2626",
        ),
    };

    let body_text = format!(
        "Dear {name},\n\n{lead}\n\nInvoice Number: #{number}\nAmount Due: {amount}\nDue Date: {due}\n\n{items}\n\n{closing}\n\nBest regards,\n{business}\n",
        name = invoice.client.name,
        lead = lead,
        number = number,
        amount = amount,
        due = due,
        items = line_items_text(invoice),
        closing = closing,
        business = business_name,
    );

    let body_html = format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>{heading}</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
<h1 style="color: {accent};">{heading}</h1>
<p>Dear {name},</p>
<p>{lead}</p>
<table style="width:100%;border-collapse:collapse">
<tr><td><strong>Invoice Number:</strong></td><td style="text-align:right">#{number}</td></tr>
<tr><td><strong>Amount Due:</strong></td><td style="text-align:right;color:{accent}">{amount}</td></tr>
<tr><td><strong>Due Date:</strong></td><td style="text-align:right">{due}</td></tr>
</table>
{items}
<p>{closing}</p>
<p>Best regards,<br><strong>{business}</strong></p>
</body></html>
"#,
        heading = heading,
        accent = accent,
        name = escape_html(&invoice.client.name),
        lead = escape_html(&lead),
        number = escape_html(number),
        amount = amount,
        due = due,
        items = line_items_html(invoice),
        closing = closing,
        business = escape_html(business_name),
    );

    EmailMessage {
        to: invoice.client.email.clone(),
        to_name: invoice.client.name.clone(),
        subject: reminder_subject(number, kind),
        body_text,
        body_html,
        attachment: None,
    }
}

/// Compose the email that delivers an invoice.
pub fn invoice_email(
    invoice: &InvoiceWithClient,
    business_name: &str,
    document: &RenderedDocument,
) -> EmailMessage {
    let number = &invoice.invoice.number;
    let amount = format_currency(invoice.invoice.total);
    let due = due_date_text(invoice);

    let body_text = format!(
        "Dear {name},\n\nPlease find attached Invoice #{number} for {amount}, due {due}.\n\n{items}\n\nThank you for your business.\n\n{business}\n",
        name = invoice.client.name,
        number = number,
        amount = amount,
        due = due,
        items = line_items_text(invoice),
        business = business_name,
    );

    let body_html = format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Invoice #{number}</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
<p>Dear {name},</p>
<p>Please find attached Invoice #{number} for <strong>{amount}</strong>, due {due}.</p>
{items}
<p>Thank you for your business.</p>
<p><strong>{business}</strong></p>
</body></html>
"#,
        number = escape_html(number),
        name = escape_html(&invoice.client.name),
        amount = amount,
        due = due,
        items = line_items_html(invoice),
        business = escape_html(business_name),
    );

    EmailMessage {
        to: invoice.client.email.clone(),
        to_name: invoice.client.name.clone(),
        subject: invoice_subject(number, business_name),
        body_text,
        body_html,
        attachment: Some(document.clone()),
    }
}

// -----------------------------------------------------------------------------
// SMTP
// -----------------------------------------------------------------------------

pub struct SmtpDispatcher {
    config: SmtpConfig,
    business_name: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpDispatcher {
    pub fn new(
        config: SmtpConfig,
        business_name: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                DispatchError::Configuration(format!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            business_name: business_name.into(),
            transport,
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, DispatchError> {
        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| {
                    DispatchError::Configuration(format!("Invalid from address: {}", e))
                })?;

        let to_address: Address = email
            .to
            .parse()
            .map_err(|e| DispatchError::InvalidRecipient(format!("{}: {}", email.to, e)))?;
        let to_mailbox = Mailbox::new(Some(email.to_name.clone()), to_address);

        let alternative = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.body_text.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(email.body_html.clone()),
            );

        let body = match &email.attachment {
            Some(doc) => {
                let content_type = ContentType::parse(doc.content_type)
                    .map_err(|e| DispatchError::Build(format!("Bad content type: {}", e)))?;
                MultiPart::mixed().multipart(alternative).singlepart(
                    Attachment::new(doc.file_name.clone()).body(doc.body.clone(), content_type),
                )
            }
            None => alternative,
        };

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email.subject)
            .multipart(body)
            .map_err(|e| DispatchError::Build(e.to_string()))
    }

    async fn deliver(&self, email: &EmailMessage) -> Result<(), DispatchError> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| DispatchError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for SmtpDispatcher {
    async fn send_reminder(&self, invoice: &InvoiceWithClient, kind: ReminderKind) -> bool {
        let email = reminder_email(invoice, kind, &self.business_name);
        match self.deliver(&email).await {
            Ok(()) => {
                info!(
                    number = %invoice.invoice.number,
                    to = %email.to,
                    kind = kind.as_str(),
                    "Reminder email sent"
                );
                true
            }
            Err(e) => {
                error!(
                    number = %invoice.invoice.number,
                    kind = kind.as_str(),
                    error = %e,
                    "Failed to send reminder email"
                );
                false
            }
        }
    }

    async fn send_invoice_notice(
        &self,
        invoice: &InvoiceWithClient,
        document: &RenderedDocument,
    ) -> bool {
        let email = invoice_email(invoice, &self.business_name, document);
        match self.deliver(&email).await {
            Ok(()) => {
                info!(number = %invoice.invoice.number, to = %email.to, "Invoice email sent");
                true
            }
            Err(e) => {
                error!(
                    number = %invoice.invoice.number,
                    error = %e,
                    "Failed to send invoice email"
                );
                false
            }
        }
    }

    fn is_configured(&self) -> bool {
        true
    }
}

// -----------------------------------------------------------------------------
// Unconfigured
// -----------------------------------------------------------------------------

/// Stand-in used when no SMTP settings are present.
pub struct DisabledDispatcher;

#[async_trait]
impl NotificationDispatcher for DisabledDispatcher {
    async fn send_reminder(&self, invoice: &InvoiceWithClient, kind: ReminderKind) -> bool {
        warn!(
            number = %invoice.invoice.number,
            kind = kind.as_str(),
            "Email service not configured, cannot send reminder"
        );
        false
    }

    async fn send_invoice_notice(
        &self,
        invoice: &InvoiceWithClient,
        _document: &RenderedDocument,
    ) -> bool {
        warn!(
            number = %invoice.invoice.number,
            "Email service not configured, cannot send invoice"
        );
        false
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Pick the dispatcher for this process.
pub fn dispatcher_from_config(
    smtp: Option<SmtpConfig>,
    business_name: &str,
) -> Result<Arc<dyn NotificationDispatcher>, AppError> {
    match smtp {
        Some(config) => {
            info!(host = %config.host, port = config.port, "SMTP email configured");
            Ok(Arc::new(SmtpDispatcher::new(config, business_name)?))
        }
        None => {
            info!("Email service not configured, notifications disabled");
            Ok(Arc::new(DisabledDispatcher))
        }
    }
}

// -----------------------------------------------------------------------------
// Recording
// -----------------------------------------------------------------------------

/// What a `RecordingDispatcher` was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub number: String,
    pub to: String,
    pub subject: String,
    /// `None` for invoice notices.
    pub kind: Option<ReminderKind>,
    pub delivered: bool,
}

/// Dispatcher that keeps every request in memory. Used by tests.
pub struct RecordingDispatcher {
    business_name: String,
    failing: HashSet<String>,
    records: Mutex<Vec<DispatchRecord>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            business_name: "Your Business".to_string(),
            failing: HashSet::new(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Report failure for the given invoice numbers.
    pub fn failing_for<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: numbers.into_iter().map(Into::into).collect(),
            ..Self::new()
        }
    }

    pub fn records(&self) -> Vec<DispatchRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn delivered_count(&self) -> usize {
        self.records().iter().filter(|r| r.delivered).count()
    }

    fn record(
        &self,
        invoice: &InvoiceWithClient,
        email: &EmailMessage,
        kind: Option<ReminderKind>,
    ) -> bool {
        let delivered = !self.failing.contains(&invoice.invoice.number);
        if let Ok(mut records) = self.records.lock() {
            records.push(DispatchRecord {
                number: invoice.invoice.number.clone(),
                to: email.to.clone(),
                subject: email.subject.clone(),
                kind,
                delivered,
            });
        }
        delivered
    }
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send_reminder(&self, invoice: &InvoiceWithClient, kind: ReminderKind) -> bool {
        let email = reminder_email(invoice, kind, &self.business_name);
        self.record(invoice, &email, Some(kind))
    }

    async fn send_invoice_notice(
        &self,
        invoice: &InvoiceWithClient,
        document: &RenderedDocument,
    ) -> bool {
        let email = invoice_email(invoice, &self.business_name, document);
        self.record(invoice, &email, None)
    }

    fn is_configured(&self) -> bool {
        true
    }
}
