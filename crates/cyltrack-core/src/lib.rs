//! # cyltrack-core: Pure Business Logic for CylTrack
//!
//! This crate is the **heart** of the cylinder fleet tracker. It contains the
//! domain model and all business rules as pure code with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CylTrack Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    REST API (axum)                              │   │
//! │  │    /users  /customers  /cylinders  /movements  /maintenance    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cyltrack-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  policy   │  │ validation│  │   │
//! │  │   │ Cylinder  │  │   Money   │  │  Action   │  │   rules   │  │   │
//! │  │   │ Movement  │  │  (cents)  │  │   table   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    cyltrack-db (Database Layer)                 │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Cylinder, Movement, Transaction, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`policy`] - Declarative role-based authorization table
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod policy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cyltrack_core::Money` instead of
// `use cyltrack_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use policy::{authorize, Action};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Days added to a completed periodic inspection to project the next one.
///
/// ## Business Reason
/// Standard annual visual inspection cadence. Other maintenance types do
/// not auto-project a next date unless a `MaintenanceSchedule` exists.
pub const ANNUAL_INSPECTION_INTERVAL_DAYS: i64 = 365;

/// Default look-ahead window for the upcoming-maintenance query.
pub const DEFAULT_MAINTENANCE_WINDOW_DAYS: i64 = 30;

/// Default page size for collection endpoints when `limit` is absent.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Hard ceiling for `limit` on collection endpoints.
///
/// ## Business Reason
/// Prevents a single request from dragging the whole table across the wire.
pub const MAX_PAGE_LIMIT: i64 = 1000;
