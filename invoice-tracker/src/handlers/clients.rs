//! Client handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{not_blank, parse_optional_money};
use crate::middleware::OwnerContext;
use crate::models::{Client, CreateClient, UpdateClient};
use crate::startup::AppState;
use service_core::error::AppError;

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(
        length(min = 1, max = 255, message = "Name is required"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(max = 255, message = "Company must be at most 255 characters"))]
    pub company: Option<String>,
    #[validate(length(max = 64, message = "Phone must be at most 64 characters"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub billing_rate: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(
        length(min = 1, max = 255, message = "Name is required"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,
    #[validate(length(max = 255, message = "Company must be at most 255 characters"))]
    pub company: Option<String>,
    #[validate(length(max = 64, message = "Phone must be at most 64 characters"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub billing_rate: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /clients
pub async fn list_clients(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<Vec<Client>>, AppError> {
    let clients = state.billing.list_clients(owner.owner_id).await?;
    Ok(Json(clients))
}

/// GET /clients/:client_id
pub async fn get_client(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = state.billing.get_client(owner.owner_id, client_id).await?;
    Ok(Json(client))
}

/// POST /clients
#[tracing::instrument(skip(state, req), fields(owner_id = %owner.owner_id))]
pub async fn create_client(
    State(state): State<AppState>,
    owner: OwnerContext,
    Json(req): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    req.validate()?;

    let input = CreateClient {
        billing_rate: parse_optional_money("billing_rate", req.billing_rate.as_deref())?,
        name: req.name.trim().to_string(),
        email: req.email,
        company: req.company,
        phone: req.phone,
        address: req.address,
    };

    let client = state.billing.create_client(owner.owner_id, input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// PATCH /clients/:client_id
pub async fn update_client(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(client_id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    req.validate()?;

    let input = UpdateClient {
        billing_rate: parse_optional_money("billing_rate", req.billing_rate.as_deref())?,
        name: req.name.map(|n| n.trim().to_string()),
        email: req.email,
        company: req.company,
        phone: req.phone,
        address: req.address,
    };

    let client = state
        .billing
        .update_client(owner.owner_id, client_id, input)
        .await?;
    Ok(Json(client))
}

/// DELETE /clients/:client_id
pub async fn delete_client(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.billing.delete_client(owner.owner_id, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
