//! # Cylinder Repository
//!
//! Database operations for cylinders.
//!
//! ## Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cylinder Identity                                    │
//! │                                                                         │
//! │  id            UUID v4, immutable, used for relations                  │
//! │  serial_number stamped on the shoulder, globally UNIQUE                │
//! │  barcode       scannable label, globally UNIQUE                        │
//! │                                                                         │
//! │  search_by_identifier() tries all three; serial and barcode are        │
//! │  unique so at most one row can match.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Position fields (`current_location_id`, `current_customer_id`) are NOT
//! updated here - they change only through movement recording, which owns
//! that invariant.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use cyltrack_core::{Cylinder, CylinderPatch, CylinderStatus};

const CYLINDER_COLUMNS: &str =
    "id, serial_number, barcode, gas_type, capacity_liters, pressure_rating_psi, \
     tare_weight_kg, status, current_location_id, current_customer_id, \
     last_inspection, next_inspection, created_at, updated_at";

/// Repository for cylinder database operations.
#[derive(Debug, Clone)]
pub struct CylinderRepository {
    pool: SqlitePool,
}

impl CylinderRepository {
    /// Creates a new CylinderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CylinderRepository { pool }
    }

    /// Inserts a cylinder.
    ///
    /// Fails with a unique violation on duplicate serial number or barcode.
    pub async fn insert(&self, cylinder: &Cylinder) -> DbResult<()> {
        debug!(id = %cylinder.id, serial = %cylinder.serial_number, "Inserting cylinder");

        sqlx::query(
            r#"
            INSERT INTO cylinders (
                id, serial_number, barcode, gas_type, capacity_liters,
                pressure_rating_psi, tare_weight_kg, status,
                current_location_id, current_customer_id,
                last_inspection, next_inspection, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cylinder.id)
        .bind(&cylinder.serial_number)
        .bind(&cylinder.barcode)
        .bind(cylinder.gas_type)
        .bind(cylinder.capacity_liters)
        .bind(cylinder.pressure_rating_psi)
        .bind(cylinder.tare_weight_kg)
        .bind(cylinder.status)
        .bind(&cylinder.current_location_id)
        .bind(&cylinder.current_customer_id)
        .bind(cylinder.last_inspection)
        .bind(cylinder.next_inspection)
        .bind(cylinder.created_at)
        .bind(cylinder.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a cylinder by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cylinder>> {
        let cylinder = sqlx::query_as::<_, Cylinder>(&format!(
            "SELECT {CYLINDER_COLUMNS} FROM cylinders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cylinder)
    }

    /// Looks a cylinder up by id, serial number, or barcode.
    ///
    /// First match wins; serial and barcode are unique so there is no
    /// tie to break.
    pub async fn search_by_identifier(&self, identifier: &str) -> DbResult<Option<Cylinder>> {
        let cylinder = sqlx::query_as::<_, Cylinder>(&format!(
            "SELECT {CYLINDER_COLUMNS} FROM cylinders \
             WHERE id = ? OR serial_number = ? OR barcode = ?"
        ))
        .bind(identifier)
        .bind(identifier)
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cylinder)
    }

    /// Lists cylinders with pagination.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<Cylinder>> {
        let cylinders = sqlx::query_as::<_, Cylinder>(&format!(
            "SELECT {CYLINDER_COLUMNS} FROM cylinders ORDER BY created_at LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(cylinders)
    }

    /// Applies an explicit patch to a cylinder and bumps `updated_at`.
    ///
    /// `patch.status` is the administrative override: it writes the status
    /// directly with no cross-entity side effects (manual corrections such
    /// as marking a cylinder `lost`).
    pub async fn update(&self, id: &str, patch: &CylinderPatch) -> DbResult<Cylinder> {
        debug!(id = %id, "Updating cylinder");
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE cylinders SET
                gas_type = COALESCE(?, gas_type),
                capacity_liters = COALESCE(?, capacity_liters),
                pressure_rating_psi = COALESCE(?, pressure_rating_psi),
                tare_weight_kg = COALESCE(?, tare_weight_kg),
                status = COALESCE(?, status),
                last_inspection = COALESCE(?, last_inspection),
                next_inspection = COALESCE(?, next_inspection),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.gas_type)
        .bind(patch.capacity_liters)
        .bind(patch.pressure_rating_psi)
        .bind(patch.tare_weight_kg)
        .bind(patch.status)
        .bind(patch.last_inspection)
        .bind(patch.next_inspection)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cylinder", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Cylinder", id))
    }

    /// Deletes a cylinder.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cylinders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cylinder", id));
        }

        Ok(())
    }

    /// Total number of cylinders.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cylinders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of cylinders in one status.
    pub async fn count_by_status(&self, status: CylinderStatus) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cylinders WHERE status = ?")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
