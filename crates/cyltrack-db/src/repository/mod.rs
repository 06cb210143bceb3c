//! # Repository Module
//!
//! Database repository implementations for CylTrack.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  REST handler                                                          │
//! │       │                                                                 │
//! │       │  db.movements().record(new_movement)                            │
//! │       ▼                                                                 │
//! │  MovementRepository                                                    │
//! │  ├── record(&self, new)      ← validates refs, writes movement AND     │
//! │  │                             cylinder position in ONE transaction    │
//! │  ├── list(&self, skip, limit)                                          │
//! │  └── history(&self, cylinder_id)                                       │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Multi-entity invariants live next to the queries that keep them     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Accounts and credentials
//! - [`customer::CustomerRepository`] - Customers and their locations
//! - [`cylinder::CylinderRepository`] - Cylinder CRUD and identifier search
//! - [`movement::MovementRepository`] - Append-only relocation history
//! - [`maintenance::MaintenanceRepository`] - Service records and schedules
//! - [`transaction::TransactionRepository`] - Sales/leases with line items
//! - [`report::ReportRepository`] - Analytics aggregates and export dumps

pub mod customer;
pub mod cylinder;
pub mod maintenance;
pub mod movement;
pub mod report;
pub mod transaction;
pub mod user;
