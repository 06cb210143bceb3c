//! # Movement Repository
//!
//! Append-only relocation history for cylinders.
//!
//! ## Movement Recording
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     record() - one transaction                          │
//! │                                                                         │
//! │  1. VALIDATE REFERENCES                                                │
//! │     ├── cylinder exists          (NotFound otherwise)                  │
//! │     ├── origin exists, if given  (None = "from depot")                 │
//! │     └── destination exists       (NotFound otherwise)                  │
//! │                                                                         │
//! │  2. BEGIN                                                              │
//! │     ├── INSERT cylinder_movements row (immutable from here on)         │
//! │     └── UPDATE cylinders SET current_location = destination,           │
//! │                              current_customer = destination's owner    │
//! │  3. COMMIT                                                             │
//! │                                                                         │
//! │  Movement rows are never updated or deleted; history is append-only.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cyltrack_core::{CylinderMovement, Location, NewMovement};

const MOVEMENT_COLUMNS: &str = "id, cylinder_id, movement_type, from_location_id, to_location_id, \
     performed_by, moved_at, notes, latitude, longitude";

/// Repository for cylinder movement operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Records a movement and repositions the cylinder, atomically.
    ///
    /// ## Arguments
    /// * `new` - movement input; `from_location_id = None` means "from depot"
    /// * `performed_by` - id of the authenticated mover
    ///
    /// ## Effects
    /// The cylinder's `current_location_id` is overwritten to the
    /// destination and `current_customer_id` to the destination's owning
    /// customer (NULL for operator-owned sites), regardless of where the
    /// cylinder was before.
    ///
    /// ## Errors
    /// `NotFound` if the cylinder, origin, or destination does not exist.
    pub async fn record(
        &self,
        new: &NewMovement,
        performed_by: &str,
    ) -> DbResult<CylinderMovement> {
        // Referential checks happen before any write
        let cylinder_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cylinders WHERE id = ?")
                .bind(&new.cylinder_id)
                .fetch_one(&self.pool)
                .await?;
        if cylinder_exists == 0 {
            return Err(DbError::not_found("Cylinder", &new.cylinder_id));
        }

        if let Some(from_id) = &new.from_location_id {
            let origin_exists: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM locations WHERE id = ?")
                    .bind(from_id)
                    .fetch_one(&self.pool)
                    .await?;
            if origin_exists == 0 {
                return Err(DbError::not_found("Location", from_id));
            }
        }

        let destination = sqlx::query_as::<_, Location>(
            "SELECT id, customer_id, name, address, city, state, zip_code, country, \
             is_primary, created_at FROM locations WHERE id = ?",
        )
        .bind(&new.to_location_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Location", &new.to_location_id))?;

        let movement = CylinderMovement {
            id: Uuid::new_v4().to_string(),
            cylinder_id: new.cylinder_id.clone(),
            movement_type: new.movement_type,
            from_location_id: new.from_location_id.clone(),
            to_location_id: new.to_location_id.clone(),
            performed_by: performed_by.to_string(),
            moved_at: Utc::now(),
            notes: new.notes.clone(),
            latitude: new.latitude,
            longitude: new.longitude,
        };

        debug!(
            id = %movement.id,
            cylinder_id = %movement.cylinder_id,
            to = %movement.to_location_id,
            "Recording movement"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO cylinder_movements (
                id, cylinder_id, movement_type, from_location_id, to_location_id,
                performed_by, moved_at, notes, latitude, longitude
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.cylinder_id)
        .bind(movement.movement_type)
        .bind(&movement.from_location_id)
        .bind(&movement.to_location_id)
        .bind(&movement.performed_by)
        .bind(movement.moved_at)
        .bind(&movement.notes)
        .bind(movement.latitude)
        .bind(movement.longitude)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE cylinders SET
                current_location_id = ?,
                current_customer_id = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&movement.to_location_id)
        .bind(&destination.customer_id)
        .bind(movement.moved_at)
        .bind(&movement.cylinder_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(movement)
    }

    /// Lists movements with pagination, newest first.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<CylinderMovement>> {
        let movements = sqlx::query_as::<_, CylinderMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cylinder_movements \
             ORDER BY moved_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Full relocation history for one cylinder, newest first.
    ///
    /// ## Errors
    /// `NotFound` if the cylinder does not exist.
    pub async fn history(&self, cylinder_id: &str) -> DbResult<Vec<CylinderMovement>> {
        let cylinder_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cylinders WHERE id = ?")
                .bind(cylinder_id)
                .fetch_one(&self.pool)
                .await?;
        if cylinder_exists == 0 {
            return Err(DbError::not_found("Cylinder", cylinder_id));
        }

        let movements = sqlx::query_as::<_, CylinderMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cylinder_movements \
             WHERE cylinder_id = ? ORDER BY moved_at DESC"
        ))
        .bind(cylinder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cyltrack_core::{Customer, Cylinder, CylinderStatus, GasType, MovementType, Role, User};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn fixture(db: &Database) -> (User, Customer, Location, Location, Cylinder) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: "driver@cyltrack.example".to_string(),
            password_hash: "x".to_string(),
            full_name: "Dru Driver".to_string(),
            role: Role::Driver,
            is_active: true,
            phone: None,
            address: None,
            license_number: Some("CDL-123".to_string()),
            vehicle_id: Some("TRK-7".to_string()),
            certification: None,
            created_at: now,
            last_login: None,
        };
        db.users().insert(&user).await.unwrap();

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Acme".to_string(),
            email: "acme@cyltrack.example".to_string(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            business_type: None,
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

        let depot = Location {
            id: Uuid::new_v4().to_string(),
            customer_id: None,
            name: "Depot".to_string(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            is_primary: true,
            created_at: now,
        };
        db.customers().insert_location(&depot).await.unwrap();

        let site = Location {
            id: Uuid::new_v4().to_string(),
            customer_id: Some(customer.id.clone()),
            name: "Acme Yard".to_string(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            is_primary: false,
            created_at: now,
        };
        db.customers().insert_location(&site).await.unwrap();

        let cylinder = Cylinder {
            id: Uuid::new_v4().to_string(),
            serial_number: "MV-1".to_string(),
            barcode: "GC0000MV-1".to_string(),
            gas_type: GasType::Argon,
            capacity_liters: 40.0,
            pressure_rating_psi: 2000.0,
            tare_weight_kg: 50.0,
            status: CylinderStatus::Available,
            current_location_id: None,
            current_customer_id: None,
            last_inspection: None,
            next_inspection: None,
            created_at: now,
            updated_at: now,
        };
        db.cylinders().insert(&cylinder).await.unwrap();

        (user, customer, depot, site, cylinder)
    }

    #[tokio::test]
    async fn test_record_updates_cylinder_position() {
        let db = test_db().await;
        let (user, customer, _depot, site, cylinder) = fixture(&db).await;

        // No origin: "from depot"
        let new = NewMovement {
            cylinder_id: cylinder.id.clone(),
            movement_type: MovementType::Delivery,
            from_location_id: None,
            to_location_id: site.id.clone(),
            notes: Some("first drop".to_string()),
            latitude: Some(29.76),
            longitude: Some(-95.36),
        };
        let movement = db.movements().record(&new, &user.id).await.unwrap();
        assert_eq!(movement.to_location_id, site.id);
        assert!(movement.from_location_id.is_none());

        let repositioned = db
            .cylinders()
            .get_by_id(&cylinder.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repositioned.current_location_id.as_deref(), Some(site.id.as_str()));
        assert_eq!(
            repositioned.current_customer_id.as_deref(),
            Some(customer.id.as_str())
        );
    }

    #[tokio::test]
    async fn test_destination_always_wins() {
        let db = test_db().await;
        let (user, _customer, depot, site, cylinder) = fixture(&db).await;

        let to_site = NewMovement {
            cylinder_id: cylinder.id.clone(),
            movement_type: MovementType::Delivery,
            from_location_id: None,
            to_location_id: site.id.clone(),
            notes: None,
            latitude: None,
            longitude: None,
        };
        db.movements().record(&to_site, &user.id).await.unwrap();

        // Return to the operator depot: location follows, customer clears
        let back = NewMovement {
            cylinder_id: cylinder.id.clone(),
            movement_type: MovementType::Return,
            from_location_id: Some(site.id.clone()),
            to_location_id: depot.id.clone(),
            notes: None,
            latitude: None,
            longitude: None,
        };
        db.movements().record(&back, &user.id).await.unwrap();

        let parked = db
            .cylinders()
            .get_by_id(&cylinder.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parked.current_location_id.as_deref(), Some(depot.id.as_str()));
        assert!(parked.current_customer_id.is_none());
    }

    #[tokio::test]
    async fn test_history_is_append_only_newest_first() {
        let db = test_db().await;
        let (user, _customer, depot, site, cylinder) = fixture(&db).await;

        for destination in [&site.id, &depot.id, &site.id] {
            let new = NewMovement {
                cylinder_id: cylinder.id.clone(),
                movement_type: MovementType::Transfer,
                from_location_id: None,
                to_location_id: destination.clone(),
                notes: None,
                latitude: None,
                longitude: None,
            };
            db.movements().record(&new, &user.id).await.unwrap();
        }

        let history = db.movements().history(&cylinder.id).await.unwrap();
        assert_eq!(history.len(), 3);
        for pair in history.windows(2) {
            assert!(pair[0].moved_at >= pair[1].moved_at);
        }
    }

    #[tokio::test]
    async fn test_missing_references_rejected() {
        let db = test_db().await;
        let (user, _customer, _depot, site, cylinder) = fixture(&db).await;

        // Missing cylinder
        let err = db
            .movements()
            .record(
                &NewMovement {
                    cylinder_id: "ghost".to_string(),
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
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // Missing destination
        let err = db
            .movements()
            .record(
                &NewMovement {
                    cylinder_id: cylinder.id.clone(),
                    movement_type: MovementType::Delivery,
                    from_location_id: None,
                    to_location_id: "nowhere".to_string(),
                    notes: None,
                    latitude: None,
                    longitude: None,
                },
                &user.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // Missing origin (explicitly provided)
        let err = db
            .movements()
            .record(
                &NewMovement {
                    cylinder_id: cylinder.id.clone(),
                    movement_type: MovementType::Delivery,
                    from_location_id: Some("nowhere".to_string()),
                    to_location_id: site.id.clone(),
                    notes: None,
                    latitude: None,
                    longitude: None,
                },
                &user.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // Nothing was written
        assert!(db.movements().history(&cylinder.id).await.unwrap().is_empty());
    }
}
