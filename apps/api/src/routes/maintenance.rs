//! Maintenance endpoints: records, due-date queries, recurring schedules.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::Pagination;
use crate::AppState;
use cyltrack_core::policy::Action;
use cyltrack_core::validation::{clamp_pagination, validate_frequency_days};
use cyltrack_core::{
    CoreError, MaintenancePatch, MaintenanceRecord, MaintenanceSchedule, MaintenanceType,
    NewMaintenanceRecord, DEFAULT_MAINTENANCE_WINDOW_DAYS,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/upcoming", get(upcoming))
        .route("/overdue", get(overdue))
        .route("/cylinder/{cylinder_id}", get(history))
        .route("/{id}", put(update))
        .route("/schedule/{cylinder_id}", post(create_schedule))
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct WindowQuery {
    /// Look-ahead window in days; defaults to 30.
    days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreateScheduleRequest {
    maintenance_type: MaintenanceType,
    frequency_days: i64,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(new): Json<NewMaintenanceRecord>,
) -> Result<Json<MaintenanceRecord>, ApiError> {
    user.require(Action::CreateMaintenance)?;

    let record = state.db.maintenance().create(&new, &user.0.id).await?;

    info!(
        record_id = %record.id,
        cylinder_id = %record.cylinder_id,
        "Maintenance record created"
    );

    Ok(Json(record))
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<MaintenanceRecord>>, ApiError> {
    user.require(Action::ReadMaintenance)?;
    let (skip, limit) = clamp_pagination(page.skip, page.limit);
    Ok(Json(state.db.maintenance().list(skip, limit).await?))
}

async fn history(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(cylinder_id): Path<String>,
) -> Result<Json<Vec<MaintenanceRecord>>, ApiError> {
    user.require(Action::ReadMaintenance)?;
    Ok(Json(state.db.maintenance().history(&cylinder_id).await?))
}

/// Patch a record. Transitioning into `completed` stamps the completion
/// time once and updates the cylinder's inspection dates; re-completing an
/// already-completed record returns 409.
async fn update(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<MaintenancePatch>,
) -> Result<Json<MaintenanceRecord>, ApiError> {
    user.require(Action::UpdateMaintenance)?;
    let record = state.db.maintenance().update(&id, &patch).await?;

    info!(record_id = %id, status = ?record.status, "Maintenance record updated");

    Ok(Json(record))
}

/// Scheduled work due within the window, soonest first.
async fn upcoming(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(window): Query<WindowQuery>,
) -> Result<Json<Vec<MaintenanceRecord>>, ApiError> {
    user.require(Action::ReadMaintenance)?;
    let days = window.days.unwrap_or(DEFAULT_MAINTENANCE_WINDOW_DAYS).max(0);
    Ok(Json(state.db.maintenance().upcoming(days).await?))
}

/// Scheduled work whose due date has passed, oldest first.
async fn overdue(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<MaintenanceRecord>>, ApiError> {
    user.require(Action::ReadMaintenance)?;
    Ok(Json(state.db.maintenance().overdue().await?))
}

async fn create_schedule(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(cylinder_id): Path<String>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<Json<MaintenanceSchedule>, ApiError> {
    user.require(Action::CreateMaintenanceSchedule)?;
    validate_frequency_days(req.frequency_days).map_err(CoreError::from)?;

    let schedule = state
        .db
        .maintenance()
        .create_schedule(&cylinder_id, req.maintenance_type, req.frequency_days)
        .await?;

    info!(
        schedule_id = %schedule.id,
        cylinder_id = %cylinder_id,
        frequency_days = req.frequency_days,
        "Maintenance schedule created"
    );

    Ok(Json(schedule))
}
