//! Invoice, line item, document and send handlers.

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{
    not_blank, parse_date, parse_line_decimal, parse_optional_date, parse_optional_money,
    parse_status,
};
use crate::middleware::OwnerContext;
use crate::models::{Invoice, InvoiceStatus, InvoiceWithClient, LineItem, UpdateInvoice};
use crate::services::billing::{NewInvoice, SendInvoiceOutcome};
use crate::services::totals::LineItemInput;
use crate::startup::AppState;
use service_core::error::AppError;

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    pub quantity: String,
    pub rate: String,
}

impl LineItemRequest {
    /// Parse quantity and rate, naming the failing field by its position in the list.
    fn parse(&self, index: usize) -> Result<LineItemInput, AppError> {
        let field = |name: &str| format!("line_items[{}].{}", index, name);
        Ok(LineItemInput::new(
            self.description.trim(),
            parse_line_decimal(&field("quantity"), &self.quantity)?,
            parse_line_decimal(&field("rate"), &self.rate)?,
        ))
    }
}

fn parse_line_items(items: &[LineItemRequest]) -> Result<Vec<LineItemInput>, AppError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| item.parse(index))
        .collect()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(
        length(min = 1, max = 64, message = "Invoice number is required"),
        custom(function = "not_blank")
    )]
    pub number: String,
    pub client_id: Uuid,
    pub issue_date: String,
    pub due_date: String,
    pub status: Option<String>,
    pub notes: Option<String>,
    #[validate(nested)]
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(
        length(min = 1, max = 64, message = "Invoice number is required"),
        custom(function = "not_blank")
    )]
    pub number: Option<String>,
    pub client_id: Option<Uuid>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub email_sent: Option<bool>,
    pub subtotal: Option<String>,
    pub tax: Option<String>,
    pub total: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceLineItemsRequest {
    #[validate(nested)]
    pub line_items: Vec<LineItemRequest>,
}

// ============================================================================
// Invoices
// ============================================================================

/// GET /invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<Vec<InvoiceWithClient>>, AppError> {
    let invoices = state.billing.list_invoices(owner.owner_id).await?;
    Ok(Json(invoices))
}

/// GET /invoices/:invoice_id
pub async fn get_invoice(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceWithClient>, AppError> {
    let invoice = state.billing.get_invoice(owner.owner_id, invoice_id).await?;
    Ok(Json(invoice))
}

/// POST /invoices
#[tracing::instrument(skip(state, req), fields(owner_id = %owner.owner_id))]
pub async fn create_invoice(
    State(state): State<AppState>,
    owner: OwnerContext,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceWithClient>), AppError> {
    req.validate()?;

    let input = NewInvoice {
        number: req.number.trim().to_string(),
        client_id: req.client_id,
        issue_date: parse_date("issue_date", &req.issue_date)?,
        due_date: parse_date("due_date", &req.due_date)?,
        status: match req.status.as_deref() {
            Some(raw) => parse_status(raw)?,
            None => InvoiceStatus::Draft,
        },
        notes: req.notes,
        line_items: parse_line_items(&req.line_items)?,
    };

    let invoice = state.billing.create_invoice(owner.owner_id, input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// PATCH /invoices/:invoice_id
pub async fn update_invoice(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    req.validate()?;

    let input = UpdateInvoice {
        number: req.number.map(|n| n.trim().to_string()),
        client_id: req.client_id,
        issue_date: parse_optional_date("issue_date", req.issue_date.as_deref())?,
        due_date: parse_optional_date("due_date", req.due_date.as_deref())?,
        status: req.status.as_deref().map(parse_status).transpose()?,
        notes: req.notes,
        email_sent: req.email_sent,
        subtotal: parse_optional_money("subtotal", req.subtotal.as_deref())?,
        tax: parse_optional_money("tax", req.tax.as_deref())?,
        total: parse_optional_money("total", req.total.as_deref())?,
    };

    let invoice = state
        .billing
        .update_invoice(owner.owner_id, invoice_id, input)
        .await?;
    Ok(Json(invoice))
}

/// DELETE /invoices/:invoice_id
pub async fn delete_invoice(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.billing.delete_invoice(owner.owner_id, invoice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Line items
// ============================================================================

/// GET /invoices/:invoice_id/line-items
pub async fn list_line_items(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<LineItem>>, AppError> {
    let items = state
        .billing
        .get_line_items(owner.owner_id, invoice_id)
        .await?;
    Ok(Json(items))
}

/// PUT /invoices/:invoice_id/line-items
///
/// Replaces every line item and returns the invoice with recomputed amounts.
pub async fn replace_line_items(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<ReplaceLineItemsRequest>,
) -> Result<Json<InvoiceWithClient>, AppError> {
    req.validate()?;

    let items = parse_line_items(&req.line_items)?;
    let invoice = state
        .billing
        .replace_line_items(owner.owner_id, invoice_id, items)
        .await?;
    Ok(Json(invoice))
}

// ============================================================================
// Actions
// ============================================================================

/// POST /invoices/:invoice_id/send
pub async fn send_invoice(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<SendInvoiceOutcome>, AppError> {
    let outcome = state
        .billing
        .send_invoice(owner.owner_id, invoice_id)
        .await?;
    Ok(Json(outcome))
}

/// GET /invoices/:invoice_id/document
pub async fn invoice_document(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let document = state
        .billing
        .render_document(owner.owner_id, invoice_id)
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", document.file_name),
            ),
        ],
        document.body,
    )
        .into_response())
}
