//! Analytics endpoints and the date-range report export.
//!
//! Charts are a client concern; these endpoints return the numbers, and
//! the export endpoint returns delimited text.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::AppState;
use cyltrack_core::policy::Action;
use cyltrack_core::Money;
use cyltrack_db::repository::report::{CustomerAnalytics, DashboardMetrics, MaintenanceAnalytics};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/cylinder-status", get(cylinder_status))
        .route("/movement-trends", get(movement_trends))
        .route("/maintenance-analytics", get(maintenance_analytics))
        .route("/customer-analytics", get(customer_analytics))
        .route("/export/report", get(export_report))
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct TrendQuery {
    /// Trailing window in days; defaults to 30.
    days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    report_type: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

/// Date-range report export: metadata plus the CSV payload.
#[derive(Debug, Serialize)]
struct ReportExport {
    report_type: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    data: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<DashboardMetrics>, ApiError> {
    user.require(Action::ViewDashboard)?;
    Ok(Json(state.db.reports().dashboard().await?))
}

async fn cylinder_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require(Action::ViewCylinderStatus)?;
    let counts = state.db.reports().cylinders_by_status().await?;
    Ok(Json(json!({ "status_counts": counts })))
}

async fn movement_trends(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<TrendQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require(Action::ViewMovementTrends)?;
    let days = query.days.unwrap_or(30).max(0);
    let counts = state.db.reports().movement_counts(days).await?;
    Ok(Json(json!({ "days": days, "movement_counts": counts })))
}

async fn maintenance_analytics(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<MaintenanceAnalytics>, ApiError> {
    user.require(Action::ViewMaintenanceAnalytics)?;
    Ok(Json(state.db.reports().maintenance_analytics().await?))
}

async fn customer_analytics(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<CustomerAnalytics>, ApiError> {
    user.require(Action::ViewCustomerAnalytics)?;
    Ok(Json(state.db.reports().customer_analytics().await?))
}

/// Date-range filtered CSV dump of movements, maintenance, or transactions.
///
/// Defaults: the trailing 30 days.
async fn export_report(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportExport>, ApiError> {
    user.require(Action::ExportReport)?;

    let end = query.end_date.unwrap_or_else(Utc::now);
    let start = query.start_date.unwrap_or(end - Duration::days(30));

    let data = match query.report_type.as_str() {
        "movements" => {
            let rows = state.db.reports().movements_between(start, end).await?;
            write_csv(
                &[
                    "timestamp",
                    "cylinder_id",
                    "movement_type",
                    "from_location",
                    "to_location",
                    "performed_by",
                ],
                rows.iter().map(|m| {
                    vec![
                        m.moved_at.to_rfc3339(),
                        m.cylinder_id.clone(),
                        enum_label(&m.movement_type),
                        m.from_location_id.clone().unwrap_or_default(),
                        m.to_location_id.clone(),
                        m.performed_by.clone(),
                    ]
                }),
            )?
        }
        "maintenance" => {
            let rows = state.db.reports().maintenance_between(start, end).await?;
            write_csv(
                &[
                    "scheduled_date",
                    "completed_date",
                    "cylinder_id",
                    "maintenance_type",
                    "status",
                    "performed_by",
                ],
                rows.iter().map(|r| {
                    vec![
                        r.scheduled_date.to_rfc3339(),
                        r.completed_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
                        r.cylinder_id.clone(),
                        enum_label(&r.maintenance_type),
                        enum_label(&r.status),
                        r.performed_by.clone(),
                    ]
                }),
            )?
        }
        "transactions" => {
            let rows = state.db.reports().transactions_between(start, end).await?;
            write_csv(
                &[
                    "created_at",
                    "completed_at",
                    "customer_id",
                    "transaction_type",
                    "status",
                    "total_amount",
                ],
                rows.iter().map(|t| {
                    vec![
                        t.created_at.to_rfc3339(),
                        t.completed_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
                        t.customer_id.clone(),
                        enum_label(&t.transaction_type),
                        enum_label(&t.status),
                        Money::from_cents(t.total_amount_cents).to_string(),
                    ]
                }),
            )?
        }
        other => {
            return Err(ApiError::bad_request(format!(
                "Invalid report type: {other}"
            )))
        }
    };

    Ok(Json(ReportExport {
        report_type: query.report_type,
        start_date: start,
        end_date: end,
        data,
    }))
}

// =============================================================================
// CSV Helpers
// =============================================================================

/// Renders a header row plus one record per item into CSV text.
fn write_csv(
    headers: &[&str],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer
        .write_record(headers)
        .map_err(|e| ApiError::Internal(format!("CSV write failed: {e}")))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| ApiError::Internal(format!("CSV write failed: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("CSV encoding failed: {e}")))
}

/// The snake_case wire label of a unit enum variant.
fn enum_label<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cyltrack_core::{MaintenanceStatus, MovementType};

    #[test]
    fn test_enum_label() {
        assert_eq!(enum_label(&MovementType::Delivery), "delivery");
        assert_eq!(enum_label(&MaintenanceStatus::InProgress), "in_progress");
    }

    #[test]
    fn test_write_csv() {
        let csv = write_csv(
            &["a", "b"],
            vec![
                vec!["1".to_string(), "x,y".to_string()],
                vec!["2".to_string(), "plain".to_string()],
            ]
            .into_iter(),
        )
        .unwrap();

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("a,b"));
        // Embedded comma gets quoted
        assert_eq!(lines.next(), Some("1,\"x,y\""));
        assert_eq!(lines.next(), Some("2,plain"));
    }
}
