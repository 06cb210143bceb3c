//! # Maintenance Repository
//!
//! Service records and recurring schedules for cylinders.
//!
//! ## Completion Transition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              update() with patch.status = completed                     │
//! │                                                                         │
//! │  scheduled / in_progress ──► completed                                 │
//! │        │                                                                │
//! │        │  one transaction:                                              │
//! │        ├── maintenance_records: status, completed_date (stamped ONCE)  │
//! │        ├── cylinders: last_inspection = completion time                │
//! │        │              next_inspection = completion + 365d              │
//! │        │              (periodic inspection type only)                  │
//! │        └── maintenance_schedules: roll last/next forward when an       │
//! │                                   active schedule matches              │
//! │                                                                         │
//! │  completed ──► completed is rejected with an invalid-state error;      │
//! │  the original completion timestamp is never overwritten.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cyltrack_core::{
    MaintenancePatch, MaintenanceRecord, MaintenanceSchedule, MaintenanceStatus, MaintenanceType,
    NewMaintenanceRecord, ANNUAL_INSPECTION_INTERVAL_DAYS,
};

const RECORD_COLUMNS: &str = "id, cylinder_id, maintenance_type, status, scheduled_date, \
     completed_date, performed_by, notes, cost_cents, pressure_test_result, \
     visual_inspection_result, leak_test_result";

const SCHEDULE_COLUMNS: &str = "id, cylinder_id, maintenance_type, frequency_days, \
     last_maintenance, next_maintenance, is_active, created_at";

/// Repository for maintenance records and schedules.
#[derive(Debug, Clone)]
pub struct MaintenanceRepository {
    pool: SqlitePool,
}

impl MaintenanceRepository {
    /// Creates a new MaintenanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MaintenanceRepository { pool }
    }

    /// Creates a maintenance record in `scheduled` status.
    ///
    /// ## Errors
    /// `NotFound` if the cylinder does not exist.
    pub async fn create(
        &self,
        new: &NewMaintenanceRecord,
        performed_by: &str,
    ) -> DbResult<MaintenanceRecord> {
        let cylinder_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cylinders WHERE id = ?")
                .bind(&new.cylinder_id)
                .fetch_one(&self.pool)
                .await?;
        if cylinder_exists == 0 {
            return Err(DbError::not_found("Cylinder", &new.cylinder_id));
        }

        let record = MaintenanceRecord {
            id: Uuid::new_v4().to_string(),
            cylinder_id: new.cylinder_id.clone(),
            maintenance_type: new.maintenance_type,
            status: MaintenanceStatus::Scheduled,
            scheduled_date: new.scheduled_date,
            completed_date: None,
            performed_by: performed_by.to_string(),
            notes: new.notes.clone(),
            cost_cents: new.cost_cents,
            pressure_test_result: None,
            visual_inspection_result: None,
            leak_test_result: None,
        };

        debug!(id = %record.id, cylinder_id = %record.cylinder_id, "Creating maintenance record");

        sqlx::query(
            r#"
            INSERT INTO maintenance_records (
                id, cylinder_id, maintenance_type, status, scheduled_date,
                completed_date, performed_by, notes, cost_cents,
                pressure_test_result, visual_inspection_result, leak_test_result
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.cylinder_id)
        .bind(record.maintenance_type)
        .bind(record.status)
        .bind(record.scheduled_date)
        .bind(record.completed_date)
        .bind(&record.performed_by)
        .bind(&record.notes)
        .bind(record.cost_cents)
        .bind(record.pressure_test_result)
        .bind(record.visual_inspection_result)
        .bind(record.leak_test_result)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Gets a maintenance record by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MaintenanceRecord>> {
        let record = sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM maintenance_records WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Lists maintenance records with pagination.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<MaintenanceRecord>> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM maintenance_records \
             ORDER BY scheduled_date DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Service history for one cylinder, newest scheduled first.
    ///
    /// ## Errors
    /// `NotFound` if the cylinder does not exist.
    pub async fn history(&self, cylinder_id: &str) -> DbResult<Vec<MaintenanceRecord>> {
        let cylinder_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cylinders WHERE id = ?")
                .bind(cylinder_id)
                .fetch_one(&self.pool)
                .await?;
        if cylinder_exists == 0 {
            return Err(DbError::not_found("Cylinder", cylinder_id));
        }

        let records = sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM maintenance_records \
             WHERE cylinder_id = ? ORDER BY scheduled_date DESC"
        ))
        .bind(cylinder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Applies an explicit patch to a maintenance record.
    ///
    /// A transition into `completed` stamps `completed_date` exactly once
    /// and side-effects the parent cylinder's inspection dates plus any
    /// active matching schedule, all in one transaction. Completing an
    /// already-completed record fails with an invalid-state error.
    pub async fn update(&self, id: &str, patch: &MaintenancePatch) -> DbResult<MaintenanceRecord> {
        let record = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("MaintenanceRecord", id))?;

        let completing = patch.status == Some(MaintenanceStatus::Completed);
        if completing && record.status == MaintenanceStatus::Completed {
            return Err(DbError::invalid_state(
                "MaintenanceRecord",
                id,
                "completed",
                "scheduled or in_progress",
            ));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE maintenance_records SET
                status = COALESCE(?, status),
                scheduled_date = COALESCE(?, scheduled_date),
                notes = COALESCE(?, notes),
                cost_cents = COALESCE(?, cost_cents),
                pressure_test_result = COALESCE(?, pressure_test_result),
                visual_inspection_result = COALESCE(?, visual_inspection_result),
                leak_test_result = COALESCE(?, leak_test_result)
            WHERE id = ?
            "#,
        )
        .bind(patch.status)
        .bind(patch.scheduled_date)
        .bind(&patch.notes)
        .bind(patch.cost_cents)
        .bind(patch.pressure_test_result)
        .bind(patch.visual_inspection_result)
        .bind(patch.leak_test_result)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if completing {
            let completed_at = Utc::now();

            debug!(id = %id, cylinder_id = %record.cylinder_id, "Completing maintenance");

            sqlx::query("UPDATE maintenance_records SET completed_date = ? WHERE id = ?")
                .bind(completed_at)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            // The cylinder's inspection clock advances with every completed
            // service; only the periodic inspection type projects a next date.
            sqlx::query("UPDATE cylinders SET last_inspection = ?, updated_at = ? WHERE id = ?")
                .bind(completed_at)
                .bind(completed_at)
                .bind(&record.cylinder_id)
                .execute(&mut *tx)
                .await?;

            if record.maintenance_type == MaintenanceType::Inspection {
                let next = completed_at + Duration::days(ANNUAL_INSPECTION_INTERVAL_DAYS);
                sqlx::query("UPDATE cylinders SET next_inspection = ? WHERE id = ?")
                    .bind(next)
                    .bind(&record.cylinder_id)
                    .execute(&mut *tx)
                    .await?;
            }

            // Roll any active matching recurring schedule forward
            sqlx::query(
                r#"
                UPDATE maintenance_schedules SET
                    last_maintenance = ?,
                    next_maintenance = datetime(?, '+' || frequency_days || ' days')
                WHERE cylinder_id = ? AND maintenance_type = ? AND is_active = 1
                "#,
            )
            .bind(completed_at)
            .bind(completed_at)
            .bind(&record.cylinder_id)
            .bind(record.maintenance_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("MaintenanceRecord", id))
    }

    /// Scheduled records due within `[now, now + window_days]`, soonest first.
    pub async fn upcoming(&self, window_days: i64) -> DbResult<Vec<MaintenanceRecord>> {
        let now = Utc::now();
        let end = now + Duration::days(window_days);

        let records = sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM maintenance_records \
             WHERE status = 'scheduled' AND scheduled_date >= ? AND scheduled_date <= ? \
             ORDER BY scheduled_date"
        ))
        .bind(now)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Scheduled records whose due date has already passed, oldest first.
    pub async fn overdue(&self) -> DbResult<Vec<MaintenanceRecord>> {
        let now = Utc::now();

        let records = sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM maintenance_records \
             WHERE status = 'scheduled' AND scheduled_date < ? \
             ORDER BY scheduled_date"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Creates a recurring-maintenance schedule for a cylinder.
    ///
    /// `next_maintenance` projects from the cylinder's last inspection when
    /// one exists, otherwise from now.
    pub async fn create_schedule(
        &self,
        cylinder_id: &str,
        maintenance_type: MaintenanceType,
        frequency_days: i64,
    ) -> DbResult<MaintenanceSchedule> {
        let last_inspection: Option<Option<chrono::DateTime<Utc>>> =
            sqlx::query_scalar("SELECT last_inspection FROM cylinders WHERE id = ?")
                .bind(cylinder_id)
                .fetch_optional(&self.pool)
                .await?;
        let last_inspection = match last_inspection {
            Some(value) => value,
            None => return Err(DbError::not_found("Cylinder", cylinder_id)),
        };

        let now = Utc::now();
        let anchor = last_inspection.unwrap_or(now);
        let schedule = MaintenanceSchedule {
            id: Uuid::new_v4().to_string(),
            cylinder_id: cylinder_id.to_string(),
            maintenance_type,
            frequency_days,
            last_maintenance: last_inspection,
            next_maintenance: anchor + Duration::days(frequency_days),
            is_active: true,
            created_at: now,
        };

        debug!(id = %schedule.id, cylinder_id = %cylinder_id, "Creating maintenance schedule");

        sqlx::query(
            r#"
            INSERT INTO maintenance_schedules (
                id, cylinder_id, maintenance_type, frequency_days,
                last_maintenance, next_maintenance, is_active, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.cylinder_id)
        .bind(schedule.maintenance_type)
        .bind(schedule.frequency_days)
        .bind(schedule.last_maintenance)
        .bind(schedule.next_maintenance)
        .bind(schedule.is_active)
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(schedule)
    }

    /// Gets a schedule by ID.
    pub async fn get_schedule(&self, id: &str) -> DbResult<Option<MaintenanceSchedule>> {
        let schedule = sqlx::query_as::<_, MaintenanceSchedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM maintenance_schedules WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(schedule)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cyltrack_core::{Cylinder, CylinderStatus, GasType, Role, User};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn fixture(db: &Database) -> (User, Cylinder) {
        let now = Utc::now();
        let tech = User {
            id: Uuid::new_v4().to_string(),
            email: "tech@cyltrack.example".to_string(),
            password_hash: "x".to_string(),
            full_name: "Terry Tech".to_string(),
            role: Role::Technician,
            is_active: true,
            phone: None,
            address: None,
            license_number: None,
            vehicle_id: None,
            certification: Some("DOT".to_string()),
            created_at: now,
            last_login: None,
        };
        db.users().insert(&tech).await.unwrap();

        let cylinder = Cylinder {
            id: Uuid::new_v4().to_string(),
            serial_number: "MT-1".to_string(),
            barcode: "GC0000MT-1".to_string(),
            gas_type: GasType::Co2,
            capacity_liters: 30.0,
            pressure_rating_psi: 1800.0,
            tare_weight_kg: 35.0,
            status: CylinderStatus::Available,
            current_location_id: None,
            current_customer_id: None,
            last_inspection: None,
            next_inspection: None,
            created_at: now,
            updated_at: now,
        };
        db.cylinders().insert(&cylinder).await.unwrap();

        (tech, cylinder)
    }

    fn new_record(
        cylinder_id: &str,
        kind: MaintenanceType,
        scheduled: chrono::DateTime<Utc>,
    ) -> NewMaintenanceRecord {
        NewMaintenanceRecord {
            cylinder_id: cylinder_id.to_string(),
            maintenance_type: kind,
            scheduled_date: scheduled,
            notes: None,
            cost_cents: Some(4500),
        }
    }

    #[tokio::test]
    async fn test_completion_stamps_once_and_updates_cylinder() {
        let db = test_db().await;
        let (tech, cylinder) = fixture(&db).await;

        let record = db
            .maintenance()
            .create(
                &new_record(&cylinder.id, MaintenanceType::Inspection, Utc::now()),
                &tech.id,
            )
            .await
            .unwrap();
        assert_eq!(record.status, MaintenanceStatus::Scheduled);
        assert!(record.completed_date.is_none());

        let patch = MaintenancePatch {
            status: Some(MaintenanceStatus::Completed),
            visual_inspection_result: Some(true),
            leak_test_result: Some(true),
            ..Default::default()
        };
        let completed = db.maintenance().update(&record.id, &patch).await.unwrap();
        assert_eq!(completed.status, MaintenanceStatus::Completed);
        let stamp = completed.completed_date.expect("completion stamped");

        // Cylinder side effects: last inspection set, annual projection
        let serviced = db
            .cylinders()
            .get_by_id(&cylinder.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(serviced.last_inspection, Some(stamp));
        let next = serviced.next_inspection.expect("annual projection");
        assert_eq!(next, stamp + Duration::days(365));

        // Second completion is rejected, stamp untouched
        let err = db
            .maintenance()
            .update(
                &record.id,
                &MaintenancePatch {
                    status: Some(MaintenanceStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));
        let unchanged = db
            .maintenance()
            .get_by_id(&record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.completed_date, Some(stamp));
    }

    #[tokio::test]
    async fn test_non_inspection_does_not_project_next() {
        let db = test_db().await;
        let (tech, cylinder) = fixture(&db).await;

        let record = db
            .maintenance()
            .create(
                &new_record(&cylinder.id, MaintenanceType::Repair, Utc::now()),
                &tech.id,
            )
            .await
            .unwrap();

        db.maintenance()
            .update(
                &record.id,
                &MaintenancePatch {
                    status: Some(MaintenanceStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let serviced = db
            .cylinders()
            .get_by_id(&cylinder.id)
            .await
            .unwrap()
            .unwrap();
        assert!(serviced.last_inspection.is_some());
        assert!(serviced.next_inspection.is_none());
    }

    #[tokio::test]
    async fn test_upcoming_and_overdue_windows() {
        let db = test_db().await;
        let (tech, cylinder) = fixture(&db).await;
        let now = Utc::now();

        // One overdue, one due in 10 days, one far out past the window
        let overdue = db
            .maintenance()
            .create(
                &new_record(
                    &cylinder.id,
                    MaintenanceType::Inspection,
                    now - Duration::days(5),
                ),
                &tech.id,
            )
            .await
            .unwrap();
        let soon = db
            .maintenance()
            .create(
                &new_record(
                    &cylinder.id,
                    MaintenanceType::Cleaning,
                    now + Duration::days(10),
                ),
                &tech.id,
            )
            .await
            .unwrap();
        db.maintenance()
            .create(
                &new_record(
                    &cylinder.id,
                    MaintenanceType::HydrostaticTest,
                    now + Duration::days(90),
                ),
                &tech.id,
            )
            .await
            .unwrap();

        let upcoming = db.maintenance().upcoming(30).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, soon.id);

        let late = db.maintenance().overdue().await.unwrap();
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].id, overdue.id);

        // Completed records drop out of both views
        db.maintenance()
            .update(
                &overdue.id,
                &MaintenancePatch {
                    status: Some(MaintenanceStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(db.maintenance().overdue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_projection_anchors() {
        let db = test_db().await;
        let (_tech, cylinder) = fixture(&db).await;

        // No inspection history: anchor is now
        let schedule = db
            .maintenance()
            .create_schedule(&cylinder.id, MaintenanceType::Inspection, 180)
            .await
            .unwrap();
        assert!(schedule.last_maintenance.is_none());
        let lead = schedule.next_maintenance - Utc::now();
        assert!(lead > Duration::days(179) && lead <= Duration::days(180));

        // With inspection history: anchor is the last inspection
        let last = Utc::now() - Duration::days(100);
        db.cylinders()
            .update(
                &cylinder.id,
                &cyltrack_core::CylinderPatch {
                    last_inspection: Some(last),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let anchored = db
            .maintenance()
            .create_schedule(&cylinder.id, MaintenanceType::Inspection, 180)
            .await
            .unwrap();
        assert_eq!(anchored.last_maintenance, Some(last));
        assert_eq!(anchored.next_maintenance, last + Duration::days(180));
    }

    #[tokio::test]
    async fn test_missing_cylinder_rejected() {
        let db = test_db().await;
        let (tech, _cylinder) = fixture(&db).await;

        let err = db
            .maintenance()
            .create(
                &new_record("ghost", MaintenanceType::Repair, Utc::now()),
                &tech.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = db
            .maintenance()
            .create_schedule("ghost", MaintenanceType::Repair, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
