//! # Customer Repository
//!
//! Database operations for customers and their physical locations.
//!
//! Locations belong to the customer aggregate for query purposes, so their
//! operations live here rather than in a separate repository.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use cyltrack_core::{Customer, CustomerPatch, Location};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, city, state, zip_code, country, \
     business_type, tax_id, credit_limit_cents, payment_terms, external_id, barcode, \
     is_active, created_at, updated_at";

const LOCATION_COLUMNS: &str =
    "id, customer_id, name, address, city, state, zip_code, country, is_primary, created_at";

/// Repository for customer and location database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer.
    ///
    /// Fails with a unique violation if the email is already registered.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, phone, address, city, state, zip_code, country,
                business_type, tax_id, credit_limit_cents, payment_terms,
                external_id, barcode, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.zip_code)
        .bind(&customer.country)
        .bind(&customer.business_type)
        .bind(&customer.tax_id)
        .bind(customer.credit_limit_cents)
        .bind(&customer.payment_terms)
        .bind(&customer.external_id)
        .bind(&customer.barcode)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by email.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by the external reference carried in bulk uploads.
    pub async fn get_by_external_id(&self, external_id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE external_id = ?"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists customers with pagination.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Applies an explicit patch to a customer and bumps `updated_at`.
    pub async fn update(&self, id: &str, patch: &CustomerPatch) -> DbResult<Customer> {
        debug!(id = %id, "Updating customer");
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                address = COALESCE(?, address),
                city = COALESCE(?, city),
                state = COALESCE(?, state),
                zip_code = COALESCE(?, zip_code),
                country = COALESCE(?, country),
                business_type = COALESCE(?, business_type),
                tax_id = COALESCE(?, tax_id),
                credit_limit_cents = COALESCE(?, credit_limit_cents),
                payment_terms = COALESCE(?, payment_terms),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(&patch.address)
        .bind(&patch.city)
        .bind(&patch.state)
        .bind(&patch.zip_code)
        .bind(&patch.country)
        .bind(&patch.business_type)
        .bind(&patch.tax_id)
        .bind(patch.credit_limit_cents)
        .bind(&patch.payment_terms)
        .bind(patch.is_active)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Deletes a customer.
    ///
    /// Event records (movements, transactions) referencing the customer
    /// persist; there is no cascade.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Inserts a location.
    ///
    /// When `location.customer_id` is set, the customer must exist.
    pub async fn insert_location(&self, location: &Location) -> DbResult<()> {
        if let Some(customer_id) = &location.customer_id {
            if self.get_by_id(customer_id).await?.is_none() {
                return Err(DbError::not_found("Customer", customer_id));
            }
        }

        debug!(id = %location.id, name = %location.name, "Inserting location");

        sqlx::query(
            r#"
            INSERT INTO locations (
                id, customer_id, name, address, city, state, zip_code, country,
                is_primary, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&location.id)
        .bind(&location.customer_id)
        .bind(&location.name)
        .bind(&location.address)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.zip_code)
        .bind(&location.country)
        .bind(location.is_primary)
        .bind(location.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a location by ID.
    pub async fn get_location(&self, id: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Gets a location scoped to one customer.
    pub async fn get_customer_location(
        &self,
        customer_id: &str,
        location_id: &str,
    ) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ? AND customer_id = ?"
        ))
        .bind(location_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Lists all locations belonging to a customer.
    pub async fn list_locations(&self, customer_id: &str) -> DbResult<Vec<Location>> {
        if self.get_by_id(customer_id).await?.is_none() {
            return Err(DbError::not_found("Customer", customer_id));
        }

        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE customer_id = ? ORDER BY created_at"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Deletes a location scoped to one customer.
    pub async fn delete_location(&self, customer_id: &str, location_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ? AND customer_id = ?")
            .bind(location_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", location_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_customer(email: &str) -> Customer {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4().to_string(),
            name: "Acme Gas Supply".to_string(),
            email: email.to_string(),
            phone: Some("555-0100".to_string()),
            address: Some("1 Industrial Way".to_string()),
            city: Some("Houston".to_string()),
            state: Some("TX".to_string()),
            zip_code: Some("77001".to_string()),
            country: Some("US".to_string()),
            business_type: Some("welding".to_string()),
            tax_id: Some("74-1234567".to_string()),
            credit_limit_cents: Some(500_000),
            payment_terms: Some("net30".to_string()),
            external_id: None,
            barcode: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_location(customer_id: Option<String>, name: &str) -> Location {
        Location {
            id: Uuid::new_v4().to_string(),
            customer_id,
            name: name.to_string(),
            address: Some("2 Dock St".to_string()),
            city: None,
            state: None,
            zip_code: None,
            country: None,
            is_primary: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let db = test_db().await;
        let customer = sample_customer("ops@acme.example");
        db.customers().insert(&customer).await.unwrap();

        let fetched = db
            .customers()
            .get_by_id(&customer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "Acme Gas Supply");
        assert_eq!(fetched.credit_limit_cents, Some(500_000));

        let all = db.customers().list(0, 10).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = test_db().await;
        db.customers()
            .insert(&sample_customer("dup@acme.example"))
            .await
            .unwrap();
        let err = db
            .customers()
            .insert(&sample_customer("dup@acme.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_patch_bumps_updated_at() {
        let db = test_db().await;
        let customer = sample_customer("patch@acme.example");
        db.customers().insert(&customer).await.unwrap();

        let patch = CustomerPatch {
            payment_terms: Some("net60".to_string()),
            ..Default::default()
        };
        let updated = db.customers().update(&customer.id, &patch).await.unwrap();
        assert_eq!(updated.payment_terms.as_deref(), Some("net60"));
        assert!(updated.updated_at >= customer.updated_at);
        // Unpatched fields unchanged
        assert_eq!(updated.city.as_deref(), Some("Houston"));
    }

    #[tokio::test]
    async fn test_locations_scoped_to_customer() {
        let db = test_db().await;
        let customer = sample_customer("sites@acme.example");
        db.customers().insert(&customer).await.unwrap();

        let site = sample_location(Some(customer.id.clone()), "North Yard");
        db.customers().insert_location(&site).await.unwrap();

        let sites = db.customers().list_locations(&customer.id).await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "North Yard");

        // Scoped lookup misses with the wrong customer
        let other = sample_customer("other@acme.example");
        db.customers().insert(&other).await.unwrap();
        let miss = db
            .customers()
            .get_customer_location(&other.id, &site.id)
            .await
            .unwrap();
        assert!(miss.is_none());

        db.customers()
            .delete_location(&customer.id, &site.id)
            .await
            .unwrap();
        let err = db
            .customers()
            .delete_location(&customer.id, &site.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_location_requires_existing_customer() {
        let db = test_db().await;
        let orphan = sample_location(Some("missing".to_string()), "Nowhere");
        let err = db.customers().insert_location(&orphan).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // Operator-owned depots carry no customer at all
        let depot = sample_location(None, "Central Depot");
        db.customers().insert_location(&depot).await.unwrap();
        assert!(db
            .customers()
            .get_location(&depot.id)
            .await
            .unwrap()
            .is_some());
    }
}
