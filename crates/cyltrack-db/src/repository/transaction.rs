//! # Transaction Repository
//!
//! Database operations for sale/lease transactions and their line items.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transaction Lifecycle                               │
//! │                                                                         │
//! │  1. CREATE (atomic)                                                    │
//! │     ├── validate customer and every referenced cylinder               │
//! │     ├── total_price = quantity × unit_price per item                   │
//! │     ├── total_amount = Σ item totals (frozen from here on)            │
//! │     └── INSERT transaction + all items in one sqlx transaction;       │
//! │         any missing cylinder aborts the lot                           │
//! │                                                                         │
//! │  2. COMPLETE (one-way)                                                 │
//! │     └── pending ──► completed, completed_at stamped once              │
//! │         any other starting state → invalid-state error                │
//! │                                                                         │
//! │  No other transitions are defined. Items are never edited after       │
//! │  creation and the total is never recomputed.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cyltrack_core::{
    Money, MovementType, NewTransactionItem, Transaction, TransactionItem, TransactionStatus,
};

const TRANSACTION_COLUMNS: &str = "id, customer_id, transaction_type, status, \
     total_amount_cents, notes, created_at, completed_at";

const ITEM_COLUMNS: &str =
    "id, transaction_id, cylinder_id, quantity, unit_price_cents, total_price_cents";

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Creates a transaction with its line items in one atomic unit.
    ///
    /// ## Arguments
    /// * `customer_id` - the billed customer; must exist
    /// * `transaction_type` - delivery/pickup/etc.
    /// * `items` - at least one line; every referenced cylinder must exist
    ///
    /// ## Errors
    /// `NotFound` if the customer or any cylinder is missing - in which case
    /// nothing is persisted.
    pub async fn create(
        &self,
        customer_id: &str,
        transaction_type: MovementType,
        notes: Option<String>,
        items: &[NewTransactionItem],
    ) -> DbResult<(Transaction, Vec<TransactionItem>)> {
        let mut tx = self.pool.begin().await?;

        let customer_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE id = ?")
                .bind(customer_id)
                .fetch_one(&mut *tx)
                .await?;
        if customer_exists == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }

        // Validate every cylinder and compute totals before writing anything
        let mut total = Money::zero();
        for item in items {
            let cylinder_exists: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM cylinders WHERE id = ?")
                    .bind(&item.cylinder_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if cylinder_exists == 0 {
                return Err(DbError::not_found("Cylinder", &item.cylinder_id));
            }
            total += item.line_total();
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            transaction_type,
            status: TransactionStatus::Pending,
            total_amount_cents: total.cents(),
            notes,
            created_at: Utc::now(),
            completed_at: None,
        };

        debug!(
            id = %transaction.id,
            customer_id = %customer_id,
            total = %total,
            items = items.len(),
            "Creating transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, customer_id, transaction_type, status,
                total_amount_cents, notes, created_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.customer_id)
        .bind(transaction.transaction_type)
        .bind(transaction.status)
        .bind(transaction.total_amount_cents)
        .bind(&transaction.notes)
        .bind(transaction.created_at)
        .bind(transaction.completed_at)
        .execute(&mut *tx)
        .await?;

        let mut persisted_items = Vec::with_capacity(items.len());
        for item in items {
            let row = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                cylinder_id: item.cylinder_id.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                total_price_cents: item.line_total().cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, cylinder_id, quantity,
                    unit_price_cents, total_price_cents
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.id)
            .bind(&row.transaction_id)
            .bind(&row.cylinder_id)
            .bind(row.quantity)
            .bind(row.unit_price_cents)
            .bind(row.total_price_cents)
            .execute(&mut *tx)
            .await?;

            persisted_items.push(row);
        }

        tx.commit().await?;

        Ok((transaction, persisted_items))
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Gets all line items for a transaction.
    pub async fn get_items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ? ORDER BY id"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists transactions with pagination, newest first.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Completes a pending transaction.
    ///
    /// The only defined transition: `pending → completed`, stamping
    /// `completed_at` exactly once. Completing a transaction in any other
    /// state fails with an invalid-state error and changes nothing.
    pub async fn complete(&self, id: &str) -> DbResult<Transaction> {
        let transaction = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        if transaction.status != TransactionStatus::Pending {
            return Err(DbError::invalid_state(
                "Transaction",
                id,
                format!("{:?}", transaction.status).to_lowercase(),
                "pending",
            ));
        }

        let now = Utc::now();

        debug!(id = %id, "Completing transaction");

        // Status guard repeated in the WHERE clause so a racing completion
        // cannot double-apply between the read above and this write.
        let result = sqlx::query(
            "UPDATE transactions SET status = 'completed', completed_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_state(
                "Transaction",
                id,
                "not pending",
                "pending",
            ));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
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
        Customer, Cylinder, CylinderStatus, GasType, Location, NewMovement, Role, User,
    };

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn insert_customer(db: &Database, email: &str) -> Customer {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Acme".to_string(),
            email: email.to_string(),
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
        customer
    }

    async fn insert_cylinder(db: &Database, serial: &str) -> Cylinder {
        let now = Utc::now();
        let cylinder = Cylinder {
            id: Uuid::new_v4().to_string(),
            serial_number: serial.to_string(),
            barcode: format!("GC{serial:0>8}"),
            gas_type: GasType::Nitrogen,
            capacity_liters: 50.0,
            pressure_rating_psi: 2400.0,
            tare_weight_kg: 60.0,
            status: CylinderStatus::Available,
            current_location_id: None,
            current_customer_id: None,
            last_inspection: None,
            next_inspection: None,
            created_at: now,
            updated_at: now,
        };
        db.cylinders().insert(&cylinder).await.unwrap();
        cylinder
    }

    fn item(cylinder_id: &str, quantity: i64, unit_price_cents: i64) -> NewTransactionItem {
        NewTransactionItem {
            cylinder_id: cylinder_id.to_string(),
            quantity,
            unit_price_cents,
        }
    }

    #[tokio::test]
    async fn test_total_is_sum_of_line_totals() {
        let db = test_db().await;
        let customer = insert_customer(&db, "txn@acme.example").await;
        let c1 = insert_cylinder(&db, "TX-1").await;
        let c2 = insert_cylinder(&db, "TX-2").await;

        let (transaction, items) = db
            .transactions()
            .create(
                &customer.id,
                MovementType::Delivery,
                Some("monthly delivery".to_string()),
                &[item(&c1.id, 2, 2500), item(&c2.id, 1, 9900)],
            )
            .await
            .unwrap();

        assert_eq!(transaction.status, TransactionStatus::Pending);
        assert_eq!(transaction.total_amount_cents, 2 * 2500 + 9900);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].total_price_cents, 5000);
        assert_eq!(items[1].total_price_cents, 9900);

        // Stored rows agree with the returned ones
        let stored_items = db.transactions().get_items(&transaction.id).await.unwrap();
        let stored_sum: i64 = stored_items.iter().map(|i| i.total_price_cents).sum();
        assert_eq!(stored_sum, transaction.total_amount_cents);
    }

    #[tokio::test]
    async fn test_missing_cylinder_aborts_everything() {
        let db = test_db().await;
        let customer = insert_customer(&db, "abort@acme.example").await;
        let c1 = insert_cylinder(&db, "AB-1").await;

        let err = db
            .transactions()
            .create(
                &customer.id,
                MovementType::Delivery,
                None,
                &[item(&c1.id, 1, 1000), item("ghost", 1, 1000)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // Nothing persisted - not even the valid first line
        assert!(db.transactions().list(0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_customer_rejected() {
        let db = test_db().await;
        let c1 = insert_cylinder(&db, "NC-1").await;

        let err = db
            .transactions()
            .create(
                "ghost",
                MovementType::Pickup,
                None,
                &[item(&c1.id, 1, 1000)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_complete_is_one_way() {
        let db = test_db().await;
        let customer = insert_customer(&db, "complete@acme.example").await;
        let c1 = insert_cylinder(&db, "CP-1").await;

        let (transaction, _) = db
            .transactions()
            .create(
                &customer.id,
                MovementType::Delivery,
                None,
                &[item(&c1.id, 1, 10000)],
            )
            .await
            .unwrap();

        let completed = db.transactions().complete(&transaction.id).await.unwrap();
        assert_eq!(completed.status, TransactionStatus::Completed);
        let stamp = completed.completed_at.expect("completion stamped");

        // Completing again must fail with the invalid-state error and keep
        // the original stamp
        let err = db.transactions().complete(&transaction.id).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));
        let unchanged = db
            .transactions()
            .get_by_id(&transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.completed_at, Some(stamp));

        // Total is never recomputed by completion
        assert_eq!(unchanged.total_amount_cents, 10000);
    }

    #[tokio::test]
    async fn test_complete_missing_transaction() {
        let db = test_db().await;
        let err = db.transactions().complete("ghost").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    /// End-to-end flow: customer → cylinder → movement → transaction →
    /// complete → second completion rejected.
    #[tokio::test]
    async fn test_full_fleet_flow() {
        let db = test_db().await;
        let now = Utc::now();

        let manager = User {
            id: Uuid::new_v4().to_string(),
            email: "mgr@cyltrack.example".to_string(),
            password_hash: "x".to_string(),
            full_name: "Morgan Manager".to_string(),
            role: Role::Manager,
            is_active: true,
            phone: None,
            address: None,
            license_number: None,
            vehicle_id: None,
            certification: None,
            created_at: now,
            last_login: None,
        };
        db.users().insert(&manager).await.unwrap();

        let customer = insert_customer(&db, "flow@acme.example").await;
        let site = Location {
            id: Uuid::new_v4().to_string(),
            customer_id: Some(customer.id.clone()),
            name: "Acme Dock".to_string(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            is_primary: true,
            created_at: now,
        };
        db.customers().insert_location(&site).await.unwrap();

        let cylinder = insert_cylinder(&db, "S1").await;

        // Movement with no origin - "from depot"
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
                &manager.id,
            )
            .await
            .unwrap();

        let placed = db
            .cylinders()
            .get_by_id(&cylinder.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placed.current_location_id.as_deref(), Some(site.id.as_str()));

        // One item: qty 1 at $100.00
        let (transaction, _) = db
            .transactions()
            .create(
                &customer.id,
                MovementType::Delivery,
                None,
                &[item(&cylinder.id, 1, 10000)],
            )
            .await
            .unwrap();
        assert_eq!(transaction.total_amount_cents, 10000);
        assert_eq!(transaction.status, TransactionStatus::Pending);

        let completed = db.transactions().complete(&transaction.id).await.unwrap();
        assert_eq!(completed.status, TransactionStatus::Completed);
        assert!(completed.completed_at.is_some());

        let err = db.transactions().complete(&transaction.id).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));
    }
}
