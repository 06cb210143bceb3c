//! Bulk ingestion endpoints.
//!
//! Accepts delimited text with a fixed required-column set per entity type.
//! Rows are processed independently: a failing row is recorded as an error
//! with its spreadsheet row number (data index + 2, accounting for the
//! header) and does not abort subsequent rows. If any row failed, the call
//! returns 400 carrying the error list and the count of rows that DID
//! succeed - those are already persisted and are not rolled back.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::AppState;
use cyltrack_core::policy::Action;
use cyltrack_core::validation::{validate_email, validate_serial_number};
use cyltrack_core::{Customer, Cylinder, CylinderStatus, GasType};
use cyltrack_db::Database;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", post(upload_customers))
        .route("/cylinders", post(upload_cylinders))
}

const CUSTOMER_COLUMNS: &[&str] = &["name", "address", "phone", "email", "customerId", "barcode"];

const CYLINDER_COLUMNS: &[&str] = &[
    "serialNumber",
    "type",
    "size",
    "condition",
    "maintenanceStatus",
    "customerId",
    "barcode",
];

// =============================================================================
// Handlers
// =============================================================================

async fn upload_customers(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    body: String,
) -> Result<Response, ApiError> {
    user.require(Action::BulkUpload)?;

    let (created, errors) = ingest_customers(&state.db, &body).await?;

    info!(successful = created.len(), failed = errors.len(), "Bulk customer upload");

    Ok(bulk_response(created, errors))
}

async fn upload_cylinders(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    body: String,
) -> Result<Response, ApiError> {
    user.require(Action::BulkUpload)?;

    let (created, errors) = ingest_cylinders(&state.db, &body).await?;

    info!(successful = created.len(), failed = errors.len(), "Bulk cylinder upload");

    Ok(bulk_response(created, errors))
}

/// 200 with the created rows, or 400 with row errors + success count.
fn bulk_response<T: serde::Serialize>(created: Vec<T>, errors: Vec<String>) -> Response {
    if errors.is_empty() {
        Json(created).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "errors": errors,
                "successful_uploads": created.len(),
            })),
        )
            .into_response()
    }
}

// =============================================================================
// Ingestion
// =============================================================================

/// Parses and persists customer rows; returns (created, row errors).
///
/// A missing required column rejects the whole upload before any row is
/// processed; per-row failures are collected and do not stop the batch.
async fn ingest_customers(
    db: &Database,
    body: &str,
) -> Result<(Vec<Customer>, Vec<String>), ApiError> {
    let mut reader = csv_reader(body);
    let indexes = column_indexes(reader.headers().map_err(bad_csv)?, CUSTOMER_COLUMNS)?;

    let mut created = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let row_number = index + 2; // header row + 1-based data rows
        let result = match record {
            Ok(record) => customer_from_row(db, &record, &indexes).await,
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(customer) => created.push(customer),
            Err(reason) => {
                warn!(row = row_number, reason = %reason, "Bulk customer row failed");
                errors.push(format!("Row {row_number}: {reason}"));
            }
        }
    }

    Ok((created, errors))
}

/// Parses and persists cylinder rows; returns (created, row errors).
async fn ingest_cylinders(
    db: &Database,
    body: &str,
) -> Result<(Vec<Cylinder>, Vec<String>), ApiError> {
    let mut reader = csv_reader(body);
    let indexes = column_indexes(reader.headers().map_err(bad_csv)?, CYLINDER_COLUMNS)?;

    let mut created = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let row_number = index + 2;
        let result = match record {
            Ok(record) => cylinder_from_row(db, &record, &indexes).await,
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(cylinder) => created.push(cylinder),
            Err(reason) => {
                warn!(row = row_number, reason = %reason, "Bulk cylinder row failed");
                errors.push(format!("Row {row_number}: {reason}"));
            }
        }
    }

    Ok((created, errors))
}

async fn customer_from_row(
    db: &Database,
    record: &csv::StringRecord,
    indexes: &[usize],
) -> Result<Customer, String> {
    let field = |slot: usize, name: &str| -> Result<String, String> {
        let value = record.get(indexes[slot]).unwrap_or("").trim();
        if value.is_empty() {
            Err(format!("{name} is required"))
        } else {
            Ok(value.to_string())
        }
    };

    let name = field(0, "name")?;
    let address = field(1, "address")?;
    let phone = field(2, "phone")?;
    let email = field(3, "email")?;
    let external_id = field(4, "customerId")?;
    let barcode = field(5, "barcode")?;

    validate_email(&email).map_err(|e| e.to_string())?;

    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        phone: Some(phone),
        address: Some(address),
        city: None,
        state: None,
        zip_code: None,
        country: None,
        business_type: None,
        tax_id: None,
        credit_limit_cents: None,
        payment_terms: None,
        external_id: Some(external_id),
        barcode: Some(barcode),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    db.customers()
        .insert(&customer)
        .await
        .map_err(|e| e.to_string())?;

    Ok(customer)
}

async fn cylinder_from_row(
    db: &Database,
    record: &csv::StringRecord,
    indexes: &[usize],
) -> Result<Cylinder, String> {
    let field = |slot: usize, name: &str| -> Result<String, String> {
        let value = record.get(indexes[slot]).unwrap_or("").trim();
        if value.is_empty() {
            Err(format!("{name} is required"))
        } else {
            Ok(value.to_string())
        }
    };

    let serial_number = field(0, "serialNumber")?;
    let gas_label = field(1, "type")?;
    let size = field(2, "size")?;
    let condition = field(3, "condition")?;
    let maintenance_status = field(4, "maintenanceStatus")?;
    let customer_ref = field(5, "customerId")?;
    let barcode = field(6, "barcode")?;

    validate_serial_number(&serial_number).map_err(|e| e.to_string())?;

    let gas_type =
        GasType::parse(&gas_label).ok_or_else(|| format!("unknown gas type '{gas_label}'"))?;
    let capacity_liters: f64 = size
        .parse()
        .map_err(|_| format!("size '{size}' is not a number"))?;
    let status = CylinderStatus::parse(&condition)
        .ok_or_else(|| format!("unknown condition '{condition}'"))?;

    // "due"/"overdue" marks the cylinder as inspection-due right away
    let next_inspection = match maintenance_status.to_ascii_lowercase().as_str() {
        "due" | "overdue" => Some(Utc::now()),
        _ => None,
    };

    // customerId may carry either the bulk external id or a real customer id
    let customer = match db
        .customers()
        .get_by_external_id(&customer_ref)
        .await
        .map_err(|e| e.to_string())?
    {
        Some(customer) => Some(customer),
        None => db
            .customers()
            .get_by_id(&customer_ref)
            .await
            .map_err(|e| e.to_string())?,
    };
    let customer = customer.ok_or_else(|| format!("customer not found: {customer_ref}"))?;

    let now = Utc::now();
    let cylinder = Cylinder {
        id: Uuid::new_v4().to_string(),
        serial_number,
        barcode,
        gas_type,
        capacity_liters,
        pressure_rating_psi: 0.0,
        tare_weight_kg: 0.0,
        status,
        current_location_id: None,
        current_customer_id: Some(customer.id),
        last_inspection: None,
        next_inspection,
        created_at: now,
        updated_at: now,
    };

    db.cylinders()
        .insert(&cylinder)
        .await
        .map_err(|e| e.to_string())?;

    Ok(cylinder)
}

// =============================================================================
// CSV Helpers
// =============================================================================

fn csv_reader(body: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes())
}

fn bad_csv(err: csv::Error) -> ApiError {
    ApiError::bad_request(format!("Invalid upload: {err}"))
}

/// Resolves each required column to its position in the header row.
///
/// Any absent column fails the whole upload with a 400 naming the missing
/// set, before a single row is touched.
fn column_indexes(headers: &csv::StringRecord, required: &[&str]) -> Result<Vec<usize>, ApiError> {
    let mut indexes = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for column in required {
        match headers.iter().position(|h| h == *column) {
            Some(index) => indexes.push(index),
            None => missing.push(*column),
        }
    }

    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    Ok(indexes)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cyltrack_db::DbConfig;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[test]
    fn test_missing_columns_rejected() {
        let headers = csv::StringRecord::from(vec!["name", "email"]);
        let err = column_indexes(&headers, CUSTOMER_COLUMNS).unwrap_err();
        let message = format!("{err}");
        assert!(message.contains("address"));
        assert!(message.contains("customerId"));
        assert!(!message.contains("email,"));
    }

    #[test]
    fn test_columns_resolve_in_any_order() {
        let headers = csv::StringRecord::from(vec![
            "barcode", "customerId", "email", "phone", "address", "name",
        ]);
        let indexes = column_indexes(&headers, CUSTOMER_COLUMNS).unwrap();
        assert_eq!(indexes, vec![5, 4, 3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_customer_rows_processed_independently() {
        let db = test_db().await;

        // Ten data rows; the row at 0-based index 5 is missing its email
        let mut body =
            String::from("name,address,phone,email,customerId,barcode\n");
        for i in 0..10 {
            if i == 5 {
                body.push_str(&format!("Customer {i},{i} Main St,555-000{i},,EXT-{i},BC-{i}\n"));
            } else {
                body.push_str(&format!(
                    "Customer {i},{i} Main St,555-000{i},c{i}@bulk.example,EXT-{i},BC-{i}\n"
                ));
            }
        }

        let (created, errors) = ingest_customers(&db, &body).await.unwrap();
        assert_eq!(created.len(), 9);
        assert_eq!(errors.len(), 1);
        // Data index 5, +2 for the header and 1-based numbering
        assert!(errors[0].starts_with("Row 7:"), "got: {}", errors[0]);
        assert!(errors[0].contains("email is required"));

        // The nine good rows are persisted despite the failure
        assert_eq!(db.customers().list(0, 100).await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_cylinder_rows_resolve_customer_by_external_id() {
        let db = test_db().await;

        let customers_csv = "name,address,phone,email,customerId,barcode\n\
             Acme,1 Main,555,acme@bulk.example,EXT-ACME,BC-ACME\n";
        let (created, errors) = ingest_customers(&db, customers_csv).await.unwrap();
        assert!(errors.is_empty());
        let acme_id = created[0].id.clone();

        let cylinders_csv =
            "serialNumber,type,size,condition,maintenanceStatus,customerId,barcode\n\
             BULK-1,oxygen,47,available,ok,EXT-ACME,GCBULK-1\n\
             BULK-2,argon,40,in_use,due,EXT-ACME,GCBULK-2\n\
             BULK-3,helium,20,available,ok,NO-SUCH,GCBULK-3\n\
             BULK-4,plasma,20,available,ok,EXT-ACME,GCBULK-4\n";
        let (created, errors) = ingest_cylinders(&db, cylinders_csv).await.unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Row 4:")); // unknown customer
        assert!(errors[1].starts_with("Row 5:")); // unknown gas type

        assert_eq!(created[0].current_customer_id.as_deref(), Some(acme_id.as_str()));
        // "due" marks the cylinder inspection-due immediately
        assert!(created[1].next_inspection.is_some());
        assert!(created[0].next_inspection.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_serial_is_a_row_error() {
        let db = test_db().await;

        let customers_csv = "name,address,phone,email,customerId,barcode\n\
             Acme,1 Main,555,acme2@bulk.example,EXT-A2,BC-A2\n";
        ingest_customers(&db, customers_csv).await.unwrap();

        let cylinders_csv =
            "serialNumber,type,size,condition,maintenanceStatus,customerId,barcode\n\
             DUP-1,oxygen,47,available,ok,EXT-A2,GCDUP-1\n\
             DUP-1,oxygen,47,available,ok,EXT-A2,GCDUP-1B\n";
        let (created, errors) = ingest_cylinders(&db, cylinders_csv).await.unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Row 3:"));
        assert!(errors[0].contains("already exists"));
    }
}
