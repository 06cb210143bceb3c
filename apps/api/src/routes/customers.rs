//! Customer endpoints, with nested location endpoints.

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
use cyltrack_core::validation::{clamp_pagination, validate_email, validate_name};
use cyltrack_core::{CoreError, Customer, CustomerPatch, Location};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete_one))
        .route("/{id}/locations", get(list_locations).post(create_location))
        .route(
            "/{id}/locations/{location_id}",
            get(get_location).delete(delete_location),
        )
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateCustomerRequest {
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    country: Option<String>,
    business_type: Option<String>,
    tax_id: Option<String>,
    credit_limit_cents: Option<i64>,
    payment_terms: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateLocationRequest {
    name: String,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    country: Option<String>,
    #[serde(default)]
    is_primary: bool,
}

// =============================================================================
// Customer Handlers
// =============================================================================

async fn create(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    user.require(Action::CreateCustomer)?;
    validate_name("name", &req.name).map_err(CoreError::from)?;
    validate_email(&req.email).map_err(CoreError::from)?;

    if state.db.customers().get_by_email(&req.email).await?.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        city: req.city,
        state: req.state,
        zip_code: req.zip_code,
        country: req.country,
        business_type: req.business_type,
        tax_id: req.tax_id,
        credit_limit_cents: req.credit_limit_cents,
        payment_terms: req.payment_terms,
        external_id: None,
        barcode: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.db.customers().insert(&customer).await?;

    info!(customer_id = %customer.id, "Customer created");

    Ok(Json(customer))
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    user.require(Action::ReadCustomer)?;
    let (skip, limit) = clamp_pagination(page.skip, page.limit);
    Ok(Json(state.db.customers().list(skip, limit).await?))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    user.require(Action::ReadCustomer)?;
    let customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {id}")))?;
    Ok(Json(customer))
}

async fn update(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>, ApiError> {
    user.require(Action::UpdateCustomer)?;
    if let Some(email) = &patch.email {
        validate_email(email).map_err(CoreError::from)?;
    }
    Ok(Json(state.db.customers().update(&id, &patch).await?))
}

async fn delete_one(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::DeleteCustomer)?;
    state.db.customers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Location Handlers
// =============================================================================

async fn create_location(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(customer_id): Path<String>,
    Json(req): Json<CreateLocationRequest>,
) -> Result<Json<Location>, ApiError> {
    user.require(Action::CreateLocation)?;
    validate_name("name", &req.name).map_err(CoreError::from)?;

    let location = Location {
        id: Uuid::new_v4().to_string(),
        customer_id: Some(customer_id),
        name: req.name,
        address: req.address,
        city: req.city,
        state: req.state,
        zip_code: req.zip_code,
        country: req.country,
        is_primary: req.is_primary,
        created_at: Utc::now(),
    };
    state.db.customers().insert_location(&location).await?;

    Ok(Json(location))
}

async fn list_locations(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Location>>, ApiError> {
    user.require(Action::ReadLocation)?;
    Ok(Json(state.db.customers().list_locations(&customer_id).await?))
}

async fn get_location(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((customer_id, location_id)): Path<(String, String)>,
) -> Result<Json<Location>, ApiError> {
    user.require(Action::ReadLocation)?;
    let location = state
        .db
        .customers()
        .get_customer_location(&customer_id, &location_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location not found: {location_id}")))?;
    Ok(Json(location))
}

async fn delete_location(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((customer_id, location_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::DeleteLocation)?;
    state
        .db
        .customers()
        .delete_location(&customer_id, &location_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
