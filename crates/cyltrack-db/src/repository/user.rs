//! # User Repository
//!
//! Database operations for user accounts.
//!
//! Credential verification and token issue live in the API layer; this
//! repository only stores and retrieves the hashed credential.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use cyltrack_core::{User, UserPatch};

/// Column list shared by every SELECT returning a full user row.
const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, is_active, \
     phone, address, license_number, vehicle_id, certification, created_at, last_login";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user.
    ///
    /// Fails with a unique violation if the email is already registered.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, email = %user.email, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name, role, is_active,
                phone, address, license_number, vehicle_id, certification,
                created_at, last_login
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.license_number)
        .bind(&user.vehicle_id)
        .bind(&user.certification)
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by email (the login identifier).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lists users with pagination.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Applies an explicit patch to a user.
    ///
    /// Each patchable column is enumerated here; a `None` field leaves the
    /// stored value untouched.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> DbResult<User> {
        debug!(id = %id, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = COALESCE(?, email),
                full_name = COALESCE(?, full_name),
                phone = COALESCE(?, phone),
                address = COALESCE(?, address),
                license_number = COALESCE(?, license_number),
                vehicle_id = COALESCE(?, vehicle_id),
                certification = COALESCE(?, certification),
                is_active = COALESCE(?, is_active)
            WHERE id = ?
            "#,
        )
        .bind(&patch.email)
        .bind(&patch.full_name)
        .bind(&patch.phone)
        .bind(&patch.address)
        .bind(&patch.license_number)
        .bind(&patch.vehicle_id)
        .bind(&patch.certification)
        .bind(patch.is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Deletes a user.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Stamps the user's last successful login.
    pub async fn touch_last_login(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
