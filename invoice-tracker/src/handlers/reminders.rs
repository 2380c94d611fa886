//! Reminder scheduler status and manual triggers.
//!
//! These routes are operational and not owner-scoped.

use axum::extract::{Json, State};

use crate::scheduler::{ReminderRunSummary, SchedulerStatus};
use crate::startup::AppState;
use service_core::error::AppError;

/// GET /reminders/status
pub async fn reminder_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// POST /reminders/due-soon/run
pub async fn run_due_soon(
    State(state): State<AppState>,
) -> Result<Json<ReminderRunSummary>, AppError> {
    let summary = state.scheduler.run_due_soon_check().await?;
    Ok(Json(summary))
}

/// POST /reminders/overdue/run
pub async fn run_overdue(
    State(state): State<AppState>,
) -> Result<Json<ReminderRunSummary>, AppError> {
    let summary = state.scheduler.run_overdue_check().await?;
    Ok(Json(summary))
}
