//! Role-based access control.
//!
//! Every profile has exactly one [`Role`] within its company. The matrix below is the single
//! place that decides what a role may do; handlers call [`require`] before touching data.
//!
//! | Role         | Grants                                                                  |
//! |--------------|-------------------------------------------------------------------------|
//! | `owner`      | everything                                                              |
//! | `admin`      | everything except changing the company's own record                     |
//! | `staff`      | front desk: customers, repairs, payments, sales, quotes, the register   |
//! | `technician` | read the catalog and customers, work repair orders, write notes         |

use crate::api::models::profiles::{CurrentUser, Role};
use crate::errors::{Error, Result};
use crate::types::{Operation, Permission, Resource};

/// Whether `role` may perform `operation` on `resource`.
pub fn allows(role: Role, resource: Resource, operation: Operation) -> bool {
    use Operation::*;
    use Resource::*;

    match role {
        Role::Owner => true,
        Role::Admin => !matches!((resource, operation), (Company, Update | Delete)),
        Role::Staff => match (resource, operation) {
            (Profiles, _) => false,
            (Company | Reports, op) => op == Read,
            (_, Read) => true,
            (Customers | Repairs | RepairPayments | Quotes | CashRegister | Notes | Notifications, Create | Update) => true,
            (Sales, Create) => true,
            (Notes, Delete) => true,
            _ => false,
        },
        Role::Technician => match (resource, operation) {
            (Company | Customers | Inventory | Technicians | Repairs | RepairPayments | Notes | Notifications, Read) => true,
            (Repairs, Update) => true,
            (Notes, Create | Update) => true,
            (Notifications, Update) => true,
            _ => false,
        },
    }
}

/// Fail with `InsufficientPermissions` unless the caller's role grants the operation.
pub fn require(user: &CurrentUser, resource: Resource, operation: Operation) -> Result<()> {
    if allows(user.role, resource, operation) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required: Permission::Allow(resource, operation),
            action: operation,
            resource,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn owner_can_do_everything() {
        for op in [Operation::Read, Operation::Create, Operation::Update, Operation::Delete] {
            assert!(allows(Role::Owner, Resource::Company, op));
            assert!(allows(Role::Owner, Resource::Profiles, op));
        }
    }

    #[test]
    fn admin_cannot_edit_company() {
        assert!(allows(Role::Admin, Resource::Company, Operation::Read));
        assert!(!allows(Role::Admin, Resource::Company, Operation::Update));
        assert!(allows(Role::Admin, Resource::Profiles, Operation::Create));
        assert!(allows(Role::Admin, Resource::Sales, Operation::Delete));
    }

    #[test]
    fn staff_runs_the_front_desk() {
        assert!(allows(Role::Staff, Resource::Sales, Operation::Create));
        assert!(!allows(Role::Staff, Resource::Sales, Operation::Delete));
        assert!(allows(Role::Staff, Resource::CashRegister, Operation::Update));
        assert!(allows(Role::Staff, Resource::Inventory, Operation::Read));
        assert!(!allows(Role::Staff, Resource::Inventory, Operation::Update));
        assert!(!allows(Role::Staff, Resource::Profiles, Operation::Read));
        assert!(allows(Role::Staff, Resource::Reports, Operation::Read));
    }

    #[test]
    fn technician_works_repairs_only() {
        assert!(allows(Role::Technician, Resource::Repairs, Operation::Update));
        assert!(!allows(Role::Technician, Resource::Repairs, Operation::Create));
        assert!(!allows(Role::Technician, Resource::RepairPayments, Operation::Create));
        assert!(!allows(Role::Technician, Resource::Sales, Operation::Read));
        assert!(!allows(Role::Technician, Resource::Reports, Operation::Read));
    }

    #[test]
    fn require_reports_the_missing_permission() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "t@example.com".into(),
            full_name: "T".into(),
            role: Role::Technician,
        };
        let err = require(&user, Resource::CashRegister, Operation::Update).unwrap_err();
        assert_eq!(err.user_message(), "Insufficient permissions to update the cash register");
        assert!(require(&user, Resource::Repairs, Operation::Read).is_ok());
    }
}
