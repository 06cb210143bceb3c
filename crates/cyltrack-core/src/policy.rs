//! # Authorization Policy
//!
//! Declarative role-based access control, evaluated before any domain
//! operation runs.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Table, One Check                                 │
//! │                                                                         │
//! │  Request ──► authenticate ──► authorize(role, Action::X) ──► handler   │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │              Action::X.allowed_roles() : &'static [Role]               │
//! │                                                                         │
//! │  Every endpoint names exactly one Action. The mapping from Action to   │
//! │  allowed roles lives HERE and nowhere else - handlers never compare    │
//! │  roles themselves.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Policy Summary
//! | operation group              | allowed roles                |
//! |------------------------------|------------------------------|
//! | create/update customers,     | admin, manager               |
//! |   cylinders, locations       |                              |
//! | deletes                      | admin                        |
//! | movement recording           | admin, manager, driver       |
//! | maintenance create/update    | admin, manager, technician   |
//! | transaction create/complete  | admin, manager               |
//! | analytics & export           | admin, manager (+ technician |
//! |                              |   for maintenance analytics) |
//! | reads                        | any authenticated caller     |
//!
//! Self-record read/update for the owning user is a separate door: see
//! [`authorize_self_or`].

use crate::error::CoreError;
use crate::types::Role;

// =============================================================================
// Actions
// =============================================================================

/// Every policy-gated operation in the system.
///
/// One variant per endpoint operation; the HTTP layer maps each route to
/// exactly one of these before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Users
    ListUsers,
    ReadUser,
    UpdateUser,
    DeleteUser,

    // Customers & locations
    CreateCustomer,
    ReadCustomer,
    UpdateCustomer,
    DeleteCustomer,
    CreateLocation,
    ReadLocation,
    DeleteLocation,

    // Cylinders
    CreateCylinder,
    ReadCylinder,
    UpdateCylinder,
    DeleteCylinder,

    // Movements
    RecordMovement,
    ReadMovement,

    // Transactions
    CreateTransaction,
    ReadTransaction,
    CompleteTransaction,

    // Maintenance
    CreateMaintenance,
    ReadMaintenance,
    UpdateMaintenance,
    CreateMaintenanceSchedule,

    // Analytics & bulk
    ViewDashboard,
    ViewCylinderStatus,
    ViewMovementTrends,
    ViewMaintenanceAnalytics,
    ViewCustomerAnalytics,
    ExportReport,
    BulkUpload,
}

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const MANAGEMENT: &[Role] = &[Role::Admin, Role::Manager];
const MANAGEMENT_AND_DRIVER: &[Role] = &[Role::Admin, Role::Manager, Role::Driver];
const MANAGEMENT_AND_TECHNICIAN: &[Role] = &[Role::Admin, Role::Manager, Role::Technician];
const ANY_AUTHENTICATED: &[Role] = &Role::ALL;

impl Action {
    /// The policy table: which roles may perform this action.
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            // Users: listing and deletion are admin-scoped; read/update get
            // the self-access override on top of this entry.
            Action::ListUsers => ADMIN_ONLY,
            Action::ReadUser => ADMIN_ONLY,
            Action::UpdateUser => ADMIN_ONLY,
            Action::DeleteUser => ADMIN_ONLY,

            Action::CreateCustomer => MANAGEMENT,
            Action::ReadCustomer => ANY_AUTHENTICATED,
            Action::UpdateCustomer => MANAGEMENT,
            Action::DeleteCustomer => ADMIN_ONLY,
            Action::CreateLocation => MANAGEMENT,
            Action::ReadLocation => ANY_AUTHENTICATED,
            Action::DeleteLocation => MANAGEMENT,

            Action::CreateCylinder => MANAGEMENT,
            Action::ReadCylinder => ANY_AUTHENTICATED,
            Action::UpdateCylinder => MANAGEMENT,
            Action::DeleteCylinder => ADMIN_ONLY,

            Action::RecordMovement => MANAGEMENT_AND_DRIVER,
            Action::ReadMovement => ANY_AUTHENTICATED,

            Action::CreateTransaction => MANAGEMENT,
            Action::ReadTransaction => ANY_AUTHENTICATED,
            Action::CompleteTransaction => MANAGEMENT,

            Action::CreateMaintenance => MANAGEMENT_AND_TECHNICIAN,
            Action::ReadMaintenance => ANY_AUTHENTICATED,
            Action::UpdateMaintenance => MANAGEMENT_AND_TECHNICIAN,
            Action::CreateMaintenanceSchedule => MANAGEMENT,

            Action::ViewDashboard => MANAGEMENT,
            Action::ViewCylinderStatus => MANAGEMENT,
            Action::ViewMovementTrends => MANAGEMENT,
            Action::ViewMaintenanceAnalytics => MANAGEMENT_AND_TECHNICIAN,
            Action::ViewCustomerAnalytics => MANAGEMENT,
            Action::ExportReport => MANAGEMENT,
            Action::BulkUpload => MANAGEMENT,
        }
    }

    /// Human-readable label used in Forbidden error messages.
    pub const fn label(self) -> &'static str {
        match self {
            Action::ListUsers => "list users",
            Action::ReadUser => "read user",
            Action::UpdateUser => "update user",
            Action::DeleteUser => "delete user",
            Action::CreateCustomer => "create customer",
            Action::ReadCustomer => "read customer",
            Action::UpdateCustomer => "update customer",
            Action::DeleteCustomer => "delete customer",
            Action::CreateLocation => "create location",
            Action::ReadLocation => "read location",
            Action::DeleteLocation => "delete location",
            Action::CreateCylinder => "create cylinder",
            Action::ReadCylinder => "read cylinder",
            Action::UpdateCylinder => "update cylinder",
            Action::DeleteCylinder => "delete cylinder",
            Action::RecordMovement => "record movement",
            Action::ReadMovement => "read movements",
            Action::CreateTransaction => "create transaction",
            Action::ReadTransaction => "read transactions",
            Action::CompleteTransaction => "complete transaction",
            Action::CreateMaintenance => "create maintenance record",
            Action::ReadMaintenance => "read maintenance records",
            Action::UpdateMaintenance => "update maintenance record",
            Action::CreateMaintenanceSchedule => "create maintenance schedule",
            Action::ViewDashboard => "view dashboard",
            Action::ViewCylinderStatus => "view cylinder status analytics",
            Action::ViewMovementTrends => "view movement trends",
            Action::ViewMaintenanceAnalytics => "view maintenance analytics",
            Action::ViewCustomerAnalytics => "view customer analytics",
            Action::ExportReport => "export report",
            Action::BulkUpload => "bulk upload",
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Checks the policy table for one (role, action) pair.
///
/// ## Example
/// ```rust
/// use cyltrack_core::policy::{authorize, Action};
/// use cyltrack_core::types::Role;
///
/// assert!(authorize(Role::Driver, Action::RecordMovement).is_ok());
/// assert!(authorize(Role::Driver, Action::DeleteCustomer).is_err());
/// ```
pub fn authorize(role: Role, action: Action) -> Result<(), CoreError> {
    if action.allowed_roles().contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Forbidden {
            role: role.as_str().to_string(),
            action: action.label().to_string(),
        })
    }
}

/// Policy check with the self-access override.
///
/// A user may always read and update their own record; otherwise the
/// regular table applies. Used for `GET/PUT /users/{id}`.
pub fn authorize_self_or(
    role: Role,
    caller_id: &str,
    target_id: &str,
    action: Action,
) -> Result<(), CoreError> {
    if caller_id == target_id {
        return Ok(());
    }
    authorize(role, action)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_can_move_but_not_delete() {
        assert!(authorize(Role::Driver, Action::RecordMovement).is_ok());
        assert!(authorize(Role::Driver, Action::DeleteCustomer).is_err());
        assert!(authorize(Role::Driver, Action::CreateCylinder).is_err());
    }

    #[test]
    fn test_deletes_are_admin_only() {
        for action in [
            Action::DeleteUser,
            Action::DeleteCustomer,
            Action::DeleteCylinder,
        ] {
            assert!(authorize(Role::Admin, action).is_ok());
            assert!(authorize(Role::Manager, action).is_err());
            assert!(authorize(Role::Technician, action).is_err());
        }
    }

    #[test]
    fn test_technician_maintenance_scope() {
        assert!(authorize(Role::Technician, Action::CreateMaintenance).is_ok());
        assert!(authorize(Role::Technician, Action::ViewMaintenanceAnalytics).is_ok());
        assert!(authorize(Role::Technician, Action::ViewDashboard).is_err());
        assert!(authorize(Role::Technician, Action::CreateTransaction).is_err());
    }

    #[test]
    fn test_reads_open_to_all_roles() {
        for role in Role::ALL {
            assert!(authorize(role, Action::ReadCylinder).is_ok());
            assert!(authorize(role, Action::ReadMovement).is_ok());
        }
    }

    #[test]
    fn test_self_access_override() {
        // A customer-role user can touch their own record...
        assert!(authorize_self_or(Role::Customer, "u1", "u1", Action::UpdateUser).is_ok());
        // ...but not someone else's.
        assert!(authorize_self_or(Role::Customer, "u1", "u2", Action::UpdateUser).is_err());
        // Admin passes through the table for other users.
        assert!(authorize_self_or(Role::Admin, "u1", "u2", Action::UpdateUser).is_ok());
    }

    #[test]
    fn test_forbidden_error_shape() {
        let err = authorize(Role::Customer, Action::BulkUpload).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Role customer is not permitted to bulk upload"
        );
    }
}
