//! User endpoints: registration, token issue, self-service, admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::error::ApiError;
use crate::routes::Pagination;
use crate::AppState;
use cyltrack_core::policy::Action;
use cyltrack_core::validation::{clamp_pagination, validate_email, validate_name};
use cyltrack_core::{Role, User, UserPatch};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(token))
        .route("/me", get(me))
        .route("/", get(list))
        .route("/{id}", get(get_one).put(update).delete(delete_one))
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    full_name: String,
    role: Role,
    phone: Option<String>,
    address: Option<String>,
    license_number: Option<String>,
    vehicle_id: Option<String>,
    certification: Option<String>,
}

/// Standard password-grant form: `username` is the email.
#[derive(Debug, Deserialize)]
struct TokenForm {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
}

// =============================================================================
// Handlers
// =============================================================================

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>, ApiError> {
    validate_email(&req.email).map_err(cyltrack_core::CoreError::from)?;
    validate_name("full_name", &req.full_name).map_err(cyltrack_core::CoreError::from)?;

    if state.db.users().get_by_email(&req.email).await?.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email,
        password_hash: hash_password(&req.password)?,
        full_name: req.full_name,
        role: req.role,
        is_active: true,
        phone: req.phone,
        address: req.address,
        license_number: req.license_number,
        vehicle_id: req.vehicle_id,
        certification: req.certification,
        created_at: Utc::now(),
        last_login: None,
    };
    state.db.users().insert(&user).await?;

    info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok(Json(user))
}

async fn token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(&form.username)
        .await?
        .filter(|u| verify_password(&form.password, &u.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Incorrect email or password"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("Inactive user"));
    }

    let access_token = state.jwt.generate_access_token(&user)?;
    state.db.users().touch_last_login(&user.id).await?;

    info!(user_id = %user.id, "Token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.jwt.access_lifetime_secs(),
    }))
}

async fn me(user: CurrentUser) -> Json<User> {
    Json(user.0)
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<User>>, ApiError> {
    user.require(Action::ListUsers)?;
    let (skip, limit) = clamp_pagination(page.skip, page.limit);
    Ok(Json(state.db.users().list(skip, limit).await?))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    user.require_self_or(&id, Action::ReadUser)?;
    let found = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {id}")))?;
    Ok(Json(found))
}

async fn update(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ApiError> {
    user.require_self_or(&id, Action::UpdateUser)?;
    if let Some(email) = &patch.email {
        validate_email(email).map_err(cyltrack_core::CoreError::from)?;
    }
    Ok(Json(state.db.users().update(&id, &patch).await?))
}

async fn delete_one(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::DeleteUser)?;
    state.db.users().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
