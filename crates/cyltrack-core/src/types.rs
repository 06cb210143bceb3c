//! # Domain Types
//!
//! Core domain types used throughout CylTrack.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Cylinder     │   │ CylinderMovement│   │   Transaction   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  serial_number  │   │  cylinder_id    │   │  customer_id    │       │
//! │  │  barcode        │   │  to_location_id │   │  status         │       │
//! │  │  status         │   │  performed_by   │   │  total_amount   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ MaintenanceRec. │   │    Customer     │   │   User / Role   │       │
//! │  │  cylinder_id    │   │    Location     │   │  policy input   │       │
//! │  │  status         │   │  (sites)        │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (serial_number, barcode, email)
//!
//! ## Patch Structs
//! Updates go through explicit `*Patch` structs that enumerate exactly the
//! mutable fields of each entity. A `None` field means "leave unchanged".
//! Immutable columns (ids, audit timestamps, append-only rows) have no patch
//! representation at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// User & Role
// =============================================================================

/// Role attached to every user; input to the authorization policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Driver,
    Technician,
    Customer,
}

impl Role {
    /// Every role, for "any authenticated caller" policy entries.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Manager,
        Role::Driver,
        Role::Technician,
        Role::Customer,
    ];

    /// Stable lowercase label, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Driver => "driver",
            Role::Technician => "technician",
            Role::Customer => "customer",
        }
    }
}

/// A staff member or portal account.
///
/// `password_hash` never leaves the backend; response shaping strips it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Driver licence, where the role is `driver`.
    pub license_number: Option<String>,
    /// Assigned vehicle, where the role is `driver`.
    pub vehicle_id: Option<String>,
    /// Certification reference, where the role is `technician`.
    pub certification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Mutable fields of a user record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub license_number: Option<String>,
    pub vehicle_id: Option<String>,
    pub certification: Option<String>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Customer & Location
// =============================================================================

/// A business entity that leases or buys cylinders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Unique contact email; doubles as the business identifier.
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub business_type: Option<String>,
    pub tax_id: Option<String>,
    pub credit_limit_cents: Option<i64>,
    pub payment_terms: Option<String>,
    /// External reference carried by bulk uploads.
    pub external_id: Option<String>,
    /// Customer barcode carried by bulk uploads.
    pub barcode: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable fields of a customer record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub business_type: Option<String>,
    pub tax_id: Option<String>,
    pub credit_limit_cents: Option<i64>,
    pub payment_terms: Option<String>,
    pub is_active: Option<bool>,
}

/// A physical site: customer premises, depot, or filling station.
///
/// `customer_id = None` marks an operator-owned site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Location {
    pub id: String,
    pub customer_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cylinder
// =============================================================================

/// Gas contained by a cylinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum GasType {
    Oxygen,
    Nitrogen,
    Argon,
    Co2,
    Acetylene,
    Helium,
}

impl GasType {
    /// Parses the snake_case label used on the wire and in bulk uploads.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "oxygen" => Some(GasType::Oxygen),
            "nitrogen" => Some(GasType::Nitrogen),
            "argon" => Some(GasType::Argon),
            "co2" => Some(GasType::Co2),
            "acetylene" => Some(GasType::Acetylene),
            "helium" => Some(GasType::Helium),
            _ => None,
        }
    }
}

/// Lifecycle state of a cylinder.
///
/// ## Transition Sources
/// Status changes only through three doors:
/// 1. Movement recording (location/possession changes, status untouched)
/// 2. Maintenance completion (inspection dates updated)
/// 3. Explicit administrative patch (manual correction, e.g. `lost`)
///
/// `lost` and `scrapped` are terminal; leaving them is an administrative
/// override, not a designed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CylinderStatus {
    Available,
    InUse,
    Maintenance,
    Lost,
    Scrapped,
}

impl CylinderStatus {
    /// Terminal states have no designed outbound transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, CylinderStatus::Lost | CylinderStatus::Scrapped)
    }

    /// Parses the snake_case label used on the wire and in bulk uploads.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "available" => Some(CylinderStatus::Available),
            "in_use" => Some(CylinderStatus::InUse),
            "maintenance" => Some(CylinderStatus::Maintenance),
            "lost" => Some(CylinderStatus::Lost),
            "scrapped" => Some(CylinderStatus::Scrapped),
            _ => None,
        }
    }
}

impl Default for CylinderStatus {
    fn default() -> Self {
        CylinderStatus::Available
    }
}

/// A physical pressure vessel tracked as a discrete asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cylinder {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Manufacturer serial number - globally unique business identifier.
    pub serial_number: String,

    /// Scannable barcode - globally unique, derived from the serial at
    /// creation time.
    pub barcode: String,

    pub gas_type: GasType,

    /// Water capacity in liters.
    pub capacity_liters: f64,

    /// Maximum working pressure in PSI.
    pub pressure_rating_psi: f64,

    /// Empty weight in kilograms.
    pub tare_weight_kg: f64,

    pub status: CylinderStatus,

    /// Where the cylinder currently sits; kept in sync by movement recording.
    pub current_location_id: Option<String>,

    /// Who currently holds the cylinder; kept in sync by movement recording.
    pub current_customer_id: Option<String>,

    pub last_inspection: Option<DateTime<Utc>>,
    pub next_inspection: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable fields of a cylinder record.
///
/// `status` here is the administrative override door: it bypasses the
/// movement/maintenance transitions and carries no cross-entity side effects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CylinderPatch {
    pub gas_type: Option<GasType>,
    pub capacity_liters: Option<f64>,
    pub pressure_rating_psi: Option<f64>,
    pub tare_weight_kg: Option<f64>,
    pub status: Option<CylinderStatus>,
    pub last_inspection: Option<DateTime<Utc>>,
    pub next_inspection: Option<DateTime<Utc>>,
}

// =============================================================================
// Movement
// =============================================================================

/// Kind of relocation or commercial event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Delivery,
    Pickup,
    Transfer,
    Maintenance,
    Return,
}

/// An immutable relocation record.
///
/// History is append-only: rows are inserted once and never mutated. The
/// side effect of inserting one is that the cylinder's current location and
/// current customer are overwritten to match the destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CylinderMovement {
    pub id: String,
    pub cylinder_id: String,
    pub movement_type: MovementType,
    /// Origin site; `None` means "from depot/unknown".
    pub from_location_id: Option<String>,
    /// Destination site - always required.
    pub to_location_id: String,
    pub performed_by: String,
    pub moved_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Input shape for recording a movement.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMovement {
    pub cylinder_id: String,
    pub movement_type: MovementType,
    pub from_location_id: Option<String>,
    pub to_location_id: String,
    pub notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// =============================================================================
// Maintenance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    Inspection,
    HydrostaticTest,
    Repair,
    Replacement,
    Cleaning,
}

impl MaintenanceType {
    /// Parses the snake_case label used on the wire.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "inspection" => Some(MaintenanceType::Inspection),
            "hydrostatic_test" => Some(MaintenanceType::HydrostaticTest),
            "repair" => Some(MaintenanceType::Repair),
            "replacement" => Some(MaintenanceType::Replacement),
            "cleaning" => Some(MaintenanceType::Cleaning),
            _ => None,
        }
    }
}

/// Service event lifecycle: scheduled → in_progress → completed/failed/cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl Default for MaintenanceStatus {
    fn default() -> Self {
        MaintenanceStatus::Scheduled
    }
}

/// A scheduled or completed service event tied to one cylinder.
///
/// `completed_date` is stamped exactly once, at the transition into
/// `completed`; that transition also updates the parent cylinder's
/// inspection dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MaintenanceRecord {
    pub id: String,
    pub cylinder_id: String,
    pub maintenance_type: MaintenanceType,
    pub status: MaintenanceStatus,
    pub scheduled_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub performed_by: String,
    pub notes: Option<String>,
    pub cost_cents: Option<i64>,
    pub pressure_test_result: Option<f64>,
    pub visual_inspection_result: Option<bool>,
    pub leak_test_result: Option<bool>,
}

/// Input shape for creating a maintenance record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMaintenanceRecord {
    pub cylinder_id: String,
    pub maintenance_type: MaintenanceType,
    pub scheduled_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub cost_cents: Option<i64>,
}

/// Mutable fields of a maintenance record.
///
/// Setting `status = completed` triggers the completion side effects;
/// `completed_date` itself is not patchable - it is stamped by the
/// transition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenancePatch {
    pub status: Option<MaintenanceStatus>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub cost_cents: Option<i64>,
    pub pressure_test_result: Option<f64>,
    pub visual_inspection_result: Option<bool>,
    pub leak_test_result: Option<bool>,
}

/// Recurring-maintenance definition used to project the next due date.
///
/// Distinct from individual [`MaintenanceRecord`] instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MaintenanceSchedule {
    pub id: String,
    pub cylinder_id: String,
    pub maintenance_type: MaintenanceType,
    pub frequency_days: i64,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// Status of a sale/lease transaction.
///
/// `pending` may transition exactly once to `completed` (terminal). No other
/// transitions are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

/// A billable sale/lease event for a customer.
///
/// `total_amount_cents` is computed from the line items at creation time
/// and never recomputed afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub customer_id: String,
    pub transaction_type: MovementType,
    pub status: TransactionStatus,
    pub total_amount_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Returns the total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A line item in a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub cylinder_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit_price, frozen at creation.
    pub total_price_cents: i64,
}

impl TransactionItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// Input shape for one line item at transaction creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransactionItem {
    pub cylinder_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl NewTransactionItem {
    /// quantity × unit_price for this line.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
