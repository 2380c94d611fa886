//! Dashboard handler.

use axum::extract::{Json, State};

use crate::middleware::OwnerContext;
use crate::services::dashboard::DashboardStats;
use crate::startup::AppState;
use service_core::error::AppError;

/// GET /dashboard/stats
pub async fn dashboard_stats(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = state.billing.dashboard(owner.owner_id).await?;
    Ok(Json(stats))
}
