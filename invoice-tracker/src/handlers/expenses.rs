//! Expense handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{not_blank, parse_date, parse_money, parse_optional_date, parse_optional_money};
use crate::middleware::OwnerContext;
use crate::models::{CreateExpense, Expense, UpdateExpense};
use crate::startup::AppState;
use service_core::error::AppError;

/// Categories offered by the expense form. Others are accepted as free text.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "office",
    "travel",
    "equipment",
    "software",
    "marketing",
    "meals",
    "utilities",
    "other",
];

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    pub amount: String,
    #[validate(
        length(min = 1, max = 50, message = "Category must be 1-50 characters"),
        custom(function = "not_blank")
    )]
    pub category: String,
    pub date: String,
    pub receipt: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExpenseRequest {
    #[validate(custom(function = "not_blank"))]
    pub description: Option<String>,
    pub amount: Option<String>,
    #[validate(
        length(min = 1, max = 50, message = "Category must be 1-50 characters"),
        custom(function = "not_blank")
    )]
    pub category: Option<String>,
    pub date: Option<String>,
    pub receipt: Option<String>,
}

fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if KNOWN_CATEGORIES.contains(&lower.as_str()) {
        lower
    } else {
        trimmed.to_string()
    }
}

/// GET /expenses
pub async fn list_expenses(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<Vec<Expense>>, AppError> {
    let expenses = state.billing.list_expenses(owner.owner_id).await?;
    Ok(Json(expenses))
}

/// GET /expenses/:expense_id
pub async fn get_expense(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<Expense>, AppError> {
    let expense = state.billing.get_expense(owner.owner_id, expense_id).await?;
    Ok(Json(expense))
}

/// POST /expenses
pub async fn create_expense(
    State(state): State<AppState>,
    owner: OwnerContext,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    req.validate()?;

    let input = CreateExpense {
        description: req.description.trim().to_string(),
        amount: parse_money("amount", &req.amount)?,
        category: normalize_category(&req.category),
        date: parse_date("date", &req.date)?,
        receipt: req.receipt,
    };

    let expense = state.billing.create_expense(owner.owner_id, input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// PATCH /expenses/:expense_id
pub async fn update_expense(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(expense_id): Path<Uuid>,
    Json(req): Json<UpdateExpenseRequest>,
) -> Result<Json<Expense>, AppError> {
    req.validate()?;

    let input = UpdateExpense {
        description: req.description.map(|d| d.trim().to_string()),
        amount: parse_optional_money("amount", req.amount.as_deref())?,
        category: req.category.as_deref().map(normalize_category),
        date: parse_optional_date("date", req.date.as_deref())?,
        receipt: req.receipt,
    };

    let expense = state
        .billing
        .update_expense(owner.owner_id, expense_id, input)
        .await?;
    Ok(Json(expense))
}

/// DELETE /expenses/:expense_id
pub async fn delete_expense(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .billing
        .delete_expense(owner.owner_id, expense_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
