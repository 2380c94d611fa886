//! Owner context extracted from request headers.
//!
//! The owner id is set by the gateway in front of this service after it has
//! authenticated the caller. A request without a usable owner id is answered
//! exactly like a request for a row that does not exist.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const OWNER_ID_HEADER: &str = "x-owner-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerContext {
    pub owner_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner_id = parts
            .headers
            .get(OWNER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Resource not found")))?;

        Ok(Self { owner_id })
    }
}
