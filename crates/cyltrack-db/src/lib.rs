//! # cyltrack-db: Database Layer for CylTrack
//!
//! This crate provides database access for the cylinder fleet tracker.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CylTrack Data Flow                               │
//! │                                                                         │
//! │  REST handler (record_movement)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cyltrack-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (cylinder.rs, │    │  (embedded)  │  │   │
//! │  │   │               │    │  movement.rs, │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  ...)         │    │ 001_init.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode, foreign keys on)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (cylinder, movement, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cyltrack_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("cyltrack.db")).await?;
//! let cylinder = db.cylinders().get_by_id("…").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::cylinder::CylinderRepository;
pub use repository::maintenance::MaintenanceRepository;
pub use repository::movement::MovementRepository;
pub use repository::report::ReportRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::user::UserRepository;
