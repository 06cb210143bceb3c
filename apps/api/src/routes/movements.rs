//! Movement and transaction endpoints.
//!
//! Both live under `/movements`: physical relocations at
//! `/movements/cylinder`, financial events at `/movements/transaction`.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::Pagination;
use crate::AppState;
use cyltrack_core::policy::Action;
use cyltrack_core::validation::{clamp_pagination, validate_quantity, validate_unit_price};
use cyltrack_core::{
    CoreError, CylinderMovement, MovementType, NewMovement, NewTransactionItem, Transaction,
    TransactionItem,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cylinder", post(record_movement).get(list_movements))
        .route("/cylinder/{cylinder_id}", get(movement_history))
        .route("/transaction", post(create_transaction).get(list_transactions))
        .route("/transaction/{id}", get(get_transaction))
        .route("/transaction/{id}/complete", put(complete_transaction))
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateTransactionRequest {
    customer_id: String,
    transaction_type: MovementType,
    notes: Option<String>,
    items: Vec<NewTransactionItem>,
}

/// A transaction with its line items, as returned on the wire.
#[derive(Debug, Serialize)]
struct TransactionResponse {
    #[serde(flatten)]
    transaction: Transaction,
    items: Vec<TransactionItem>,
}

// =============================================================================
// Movement Handlers
// =============================================================================

async fn record_movement(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(new): Json<NewMovement>,
) -> Result<Json<CylinderMovement>, ApiError> {
    user.require(Action::RecordMovement)?;

    let movement = state.db.movements().record(&new, &user.0.id).await?;

    info!(
        movement_id = %movement.id,
        cylinder_id = %movement.cylinder_id,
        to = %movement.to_location_id,
        "Movement recorded"
    );

    Ok(Json(movement))
}

async fn list_movements(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<CylinderMovement>>, ApiError> {
    user.require(Action::ReadMovement)?;
    let (skip, limit) = clamp_pagination(page.skip, page.limit);
    Ok(Json(state.db.movements().list(skip, limit).await?))
}

async fn movement_history(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(cylinder_id): Path<String>,
) -> Result<Json<Vec<CylinderMovement>>, ApiError> {
    user.require(Action::ReadMovement)?;
    Ok(Json(state.db.movements().history(&cylinder_id).await?))
}

// =============================================================================
// Transaction Handlers
// =============================================================================

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    user.require(Action::CreateTransaction)?;

    if req.items.is_empty() {
        return Err(CoreError::EmptyTransaction.into());
    }
    for item in &req.items {
        validate_quantity(item.quantity).map_err(CoreError::from)?;
        validate_unit_price(item.unit_price_cents).map_err(CoreError::from)?;
    }

    let (transaction, items) = state
        .db
        .transactions()
        .create(
            &req.customer_id,
            req.transaction_type,
            req.notes,
            &req.items,
        )
        .await?;

    info!(
        transaction_id = %transaction.id,
        customer_id = %transaction.customer_id,
        total_cents = transaction.total_amount_cents,
        "Transaction created"
    );

    Ok(Json(TransactionResponse { transaction, items }))
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    user.require(Action::ReadTransaction)?;
    let (skip, limit) = clamp_pagination(page.skip, page.limit);
    Ok(Json(state.db.transactions().list(skip, limit).await?))
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    user.require(Action::ReadTransaction)?;
    let transaction = state
        .db
        .transactions()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Transaction not found: {id}")))?;
    let items = state.db.transactions().get_items(&id).await?;
    Ok(Json(TransactionResponse { transaction, items }))
}

/// One-way completion: `pending → completed`, 409 on anything else.
async fn complete_transaction(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    user.require(Action::CompleteTransaction)?;
    let transaction = state.db.transactions().complete(&id).await?;

    info!(transaction_id = %id, "Transaction completed");

    Ok(Json(transaction))
}
