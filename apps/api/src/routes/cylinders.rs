//! Cylinder endpoints: CRUD, identifier search, administrative status edits.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::Pagination;
use crate::AppState;
use cyltrack_core::policy::Action;
use cyltrack_core::validation::{clamp_pagination, validate_serial_number};
use cyltrack_core::{CoreError, Cylinder, CylinderPatch, CylinderStatus, GasType};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete_one))
        .route("/search/{identifier}", get(search))
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateCylinderRequest {
    serial_number: String,
    gas_type: GasType,
    capacity_liters: f64,
    pressure_rating_psi: f64,
    tare_weight_kg: f64,
}

/// Barcode derivation: `GC` + serial zero-padded to 8 characters.
fn derive_barcode(serial_number: &str) -> String {
    format!("GC{serial_number:0>8}")
}

// =============================================================================
// Handlers
// =============================================================================

async fn create(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateCylinderRequest>,
) -> Result<Json<Cylinder>, ApiError> {
    user.require(Action::CreateCylinder)?;
    validate_serial_number(&req.serial_number).map_err(CoreError::from)?;

    let now = Utc::now();
    let cylinder = Cylinder {
        id: Uuid::new_v4().to_string(),
        barcode: derive_barcode(&req.serial_number),
        serial_number: req.serial_number,
        gas_type: req.gas_type,
        capacity_liters: req.capacity_liters,
        pressure_rating_psi: req.pressure_rating_psi,
        tare_weight_kg: req.tare_weight_kg,
        status: CylinderStatus::Available,
        current_location_id: None,
        current_customer_id: None,
        last_inspection: None,
        next_inspection: None,
        created_at: now,
        updated_at: now,
    };
    state.db.cylinders().insert(&cylinder).await?;

    info!(
        cylinder_id = %cylinder.id,
        serial = %cylinder.serial_number,
        "Cylinder created"
    );

    Ok(Json(cylinder))
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Cylinder>>, ApiError> {
    user.require(Action::ReadCylinder)?;
    let (skip, limit) = clamp_pagination(page.skip, page.limit);
    Ok(Json(state.db.cylinders().list(skip, limit).await?))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Cylinder>, ApiError> {
    user.require(Action::ReadCylinder)?;
    let cylinder = state
        .db
        .cylinders()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cylinder not found: {id}")))?;
    Ok(Json(cylinder))
}

/// Administrative update. `status` in the patch is the manual-override door
/// (e.g. marking a cylinder `lost`); it carries no cross-entity side effects.
async fn update(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<CylinderPatch>,
) -> Result<Json<Cylinder>, ApiError> {
    user.require(Action::UpdateCylinder)?;
    Ok(Json(state.db.cylinders().update(&id, &patch).await?))
}

async fn delete_one(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::DeleteCylinder)?;
    state.db.cylinders().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lookup by id, serial number, or barcode - first match wins.
async fn search(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(identifier): Path<String>,
) -> Result<Json<Cylinder>, ApiError> {
    user.require(Action::ReadCylinder)?;
    let cylinder = state
        .db
        .cylinders()
        .search_by_identifier(&identifier)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cylinder not found: {identifier}")))?;
    Ok(Json(cylinder))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barcode_derivation() {
        assert_eq!(derive_barcode("S1"), "GC000000S1");
        assert_eq!(derive_barcode("12345678"), "GC12345678");
        assert_eq!(derive_barcode("LONGSERIAL99"), "GCLONGSERIAL99");
    }
}
