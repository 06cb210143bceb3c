//! # Report Repository
//!
//! Read-only aggregate queries backing the analytics endpoints and the
//! date-range report export.
//!
//! Everything here is a plain SELECT; the shapes returned are wire-ready
//! and never feed back into domain writes.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;
use cyltrack_core::{CylinderMovement, MaintenanceRecord, Transaction};

// =============================================================================
// Aggregate Shapes
// =============================================================================

/// One (label, count) bucket in a group-by result.
#[derive(Debug, Clone, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Headline numbers for the operations dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_cylinders: i64,
    pub cylinders_by_status: Vec<LabelCount>,
    pub total_customers: i64,
    pub recent_transactions: Vec<Transaction>,
    pub upcoming_maintenance: Vec<MaintenanceRecord>,
}

/// Aggregates for the maintenance analytics endpoint.
#[derive(Debug, Serialize)]
pub struct MaintenanceAnalytics {
    pub counts_by_type: Vec<LabelCount>,
    /// Percentage of records that have reached `completed`.
    pub completion_rate: f64,
    /// Mean (completed_date - scheduled_date) in days, completed records only.
    pub avg_completion_days: Option<f64>,
}

/// One row of the top-customers ranking.
#[derive(Debug, Serialize)]
pub struct TopCustomer {
    pub name: String,
    pub cylinder_count: i64,
}

/// Aggregates for the customer analytics endpoint.
#[derive(Debug, Serialize)]
pub struct CustomerAnalytics {
    pub top_customers: Vec<TopCustomer>,
    pub business_type_distribution: Vec<LabelCount>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for analytics aggregates and export dumps.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Headline dashboard metrics: fleet size, status breakdown, customer
    /// count, five most recent transactions, five next scheduled services.
    pub async fn dashboard(&self) -> DbResult<DashboardMetrics> {
        let total_cylinders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cylinders")
            .fetch_one(&self.pool)
            .await?;

        let cylinders_by_status = self.cylinders_by_status().await?;

        let total_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        let recent_transactions = sqlx::query_as::<_, Transaction>(
            "SELECT id, customer_id, transaction_type, status, total_amount_cents, \
             notes, created_at, completed_at \
             FROM transactions ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        let upcoming_maintenance = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT id, cylinder_id, maintenance_type, status, scheduled_date, \
             completed_date, performed_by, notes, cost_cents, pressure_test_result, \
             visual_inspection_result, leak_test_result \
             FROM maintenance_records \
             WHERE status = 'scheduled' AND scheduled_date >= ? \
             ORDER BY scheduled_date LIMIT 5",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardMetrics {
            total_cylinders,
            cylinders_by_status,
            total_customers,
            recent_transactions,
            upcoming_maintenance,
        })
    }

    /// Cylinder counts grouped by lifecycle status.
    pub async fn cylinders_by_status(&self) -> DbResult<Vec<LabelCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM cylinders GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(label, count)| LabelCount { label, count })
            .collect())
    }

    /// Movement counts by type over the trailing `days`-day window.
    pub async fn movement_counts(&self, days: i64) -> DbResult<Vec<LabelCount>> {
        let cutoff = Utc::now() - Duration::days(days);

        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT movement_type, COUNT(*) FROM cylinder_movements \
             WHERE moved_at >= ? GROUP BY movement_type ORDER BY movement_type",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(label, count)| LabelCount { label, count })
            .collect())
    }

    /// Maintenance counts by type, completion rate, and mean days from
    /// scheduled to completed.
    pub async fn maintenance_analytics(&self) -> DbResult<MaintenanceAnalytics> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT maintenance_type, COUNT(*) FROM maintenance_records \
             GROUP BY maintenance_type ORDER BY maintenance_type",
        )
        .fetch_all(&self.pool)
        .await?;
        let counts_by_type = rows
            .into_iter()
            .map(|(label, count)| LabelCount { label, count })
            .collect();

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_records")
            .fetch_one(&self.pool)
            .await?;
        let completed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM maintenance_records WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;

        let completion_rate = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let avg_completion_days: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(julianday(completed_date) - julianday(scheduled_date)) \
             FROM maintenance_records WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(MaintenanceAnalytics {
            counts_by_type,
            completion_rate,
            avg_completion_days,
        })
    }

    /// Top ten customers by cylinders currently in their possession, plus
    /// the customer distribution by business type.
    pub async fn customer_analytics(&self) -> DbResult<CustomerAnalytics> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT c.name, COUNT(cy.id) FROM customers c \
             JOIN cylinders cy ON cy.current_customer_id = c.id \
             GROUP BY c.id ORDER BY COUNT(cy.id) DESC LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?;
        let top_customers = rows
            .into_iter()
            .map(|(name, cylinder_count)| TopCustomer {
                name,
                cylinder_count,
            })
            .collect();

        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT business_type, COUNT(*) FROM customers \
             GROUP BY business_type ORDER BY COUNT(*) DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        let business_type_distribution = rows
            .into_iter()
            .map(|(label, count)| LabelCount {
                label: label.unwrap_or_else(|| "unknown".to_string()),
                count,
            })
            .collect();

        Ok(CustomerAnalytics {
            top_customers,
            business_type_distribution,
        })
    }

    // =========================================================================
    // Date-range dumps for report export
    // =========================================================================

    /// Movements within `[start, end]`, oldest first.
    pub async fn movements_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<CylinderMovement>> {
        let movements = sqlx::query_as::<_, CylinderMovement>(
            "SELECT id, cylinder_id, movement_type, from_location_id, to_location_id, \
             performed_by, moved_at, notes, latitude, longitude \
             FROM cylinder_movements WHERE moved_at BETWEEN ? AND ? ORDER BY moved_at",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Maintenance records scheduled within `[start, end]`, oldest first.
    pub async fn maintenance_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<MaintenanceRecord>> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT id, cylinder_id, maintenance_type, status, scheduled_date, \
             completed_date, performed_by, notes, cost_cents, pressure_test_result, \
             visual_inspection_result, leak_test_result \
             FROM maintenance_records WHERE scheduled_date BETWEEN ? AND ? \
             ORDER BY scheduled_date",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Transactions created within `[start, end]`, oldest first.
    pub async fn transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT id, customer_id, transaction_type, status, total_amount_cents, \
             notes, created_at, completed_at \
             FROM transactions WHERE created_at BETWEEN ? AND ? ORDER BY created_at",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cyltrack_core::{
        Customer, Cylinder, CylinderStatus, GasType, Location, MovementType, NewMovement,
        NewTransactionItem, Role, User,
    };
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed(db: &Database) -> (Customer, Cylinder) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: "seed@cyltrack.example".to_string(),
            password_hash: "x".to_string(),
            full_name: "Seed".to_string(),
            role: Role::Admin,
            is_active: true,
            phone: None,
            address: None,
            license_number: None,
            vehicle_id: None,
            certification: None,
            created_at: now,
            last_login: None,
        };
        db.users().insert(&user).await.unwrap();

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Acme".to_string(),
            email: "acme-report@cyltrack.example".to_string(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            business_type: Some("welding".to_string()),
            tax_id: None,
            credit_limit_cents: None,
            payment_terms: None,
            external_id: None,
            barcode: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(&customer).await.unwrap();

        let site = Location {
            id: Uuid::new_v4().to_string(),
            customer_id: Some(customer.id.clone()),
            name: "Site".to_string(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            is_primary: true,
            created_at: now,
        };
        db.customers().insert_location(&site).await.unwrap();

        let cylinder = Cylinder {
            id: Uuid::new_v4().to_string(),
            serial_number: "RP-1".to_string(),
            barcode: "GC0000RP-1".to_string(),
            gas_type: GasType::Helium,
            capacity_liters: 20.0,
            pressure_rating_psi: 2000.0,
            tare_weight_kg: 25.0,
            status: CylinderStatus::Available,
            current_location_id: None,
            current_customer_id: None,
            last_inspection: None,
            next_inspection: None,
            created_at: now,
            updated_at: now,
        };
        db.cylinders().insert(&cylinder).await.unwrap();

        db.movements()
            .record(
                &NewMovement {
                    cylinder_id: cylinder.id.clone(),
                    movement_type: MovementType::Delivery,
                    from_location_id: None,
                    to_location_id: site.id.clone(),
                    notes: None,
                    latitude: None,
                    longitude: None,
                },
                &user.id,
            )
            .await
            .unwrap();

        db.transactions()
            .create(
                &customer.id,
                MovementType::Delivery,
                None,
                &[NewTransactionItem {
                    cylinder_id: cylinder.id.clone(),
                    quantity: 1,
                    unit_price_cents: 5000,
                }],
            )
            .await
            .unwrap();

        (customer, cylinder)
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let db = test_db().await;
        seed(&db).await;

        let metrics = db.reports().dashboard().await.unwrap();
        assert_eq!(metrics.total_cylinders, 1);
        assert_eq!(metrics.total_customers, 1);
        assert_eq!(metrics.recent_transactions.len(), 1);
        assert_eq!(metrics.cylinders_by_status.len(), 1);
        assert_eq!(metrics.cylinders_by_status[0].label, "available");
        assert_eq!(metrics.cylinders_by_status[0].count, 1);
    }

    #[tokio::test]
    async fn test_movement_counts_window() {
        let db = test_db().await;
        seed(&db).await;

        let counts = db.reports().movement_counts(30).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].label, "delivery");
        assert_eq!(counts[0].count, 1);
    }

    #[tokio::test]
    async fn test_customer_analytics_possession() {
        let db = test_db().await;
        let (customer, _cylinder) = seed(&db).await;

        let analytics = db.reports().customer_analytics().await.unwrap();
        assert_eq!(analytics.top_customers.len(), 1);
        assert_eq!(analytics.top_customers[0].name, customer.name);
        assert_eq!(analytics.top_customers[0].cylinder_count, 1);
        assert_eq!(analytics.business_type_distribution[0].label, "welding");
    }

    #[tokio::test]
    async fn test_maintenance_analytics_empty() {
        let db = test_db().await;
        let analytics = db.reports().maintenance_analytics().await.unwrap();
        assert!(analytics.counts_by_type.is_empty());
        assert_eq!(analytics.completion_rate, 0.0);
        assert!(analytics.avg_completion_days.is_none());
    }

    #[tokio::test]
    async fn test_date_range_dumps() {
        let db = test_db().await;
        seed(&db).await;

        let start = Utc::now() - Duration::days(1);
        let end = Utc::now() + Duration::days(1);

        assert_eq!(db.reports().movements_between(start, end).await.unwrap().len(), 1);
        assert_eq!(
            db.reports()
                .transactions_between(start, end)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(db
            .reports()
            .maintenance_between(start, end)
            .await
            .unwrap()
            .is_empty());

        // Outside the window
        let future = Utc::now() + Duration::days(10);
        assert!(db
            .reports()
            .movements_between(future, future + Duration::days(1))
            .await
            .unwrap()
            .is_empty());
    }
}
