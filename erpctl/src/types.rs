//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (CompanyId, ProfileId, etc.)
//! - Permission and authorization types
//! - Resource and operation enums for access control
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases. Every tenant-owned row carries a
//! [`CompanyId`]; repositories are constructed with one and never cross it.
//!
//! # Permission System
//!
//! - [`Resource`]: What entity family is being accessed (Customers, Repairs, Sales, ...)
//! - [`Operation`]: What action is being performed (Read, Create, Update, Delete)
//! - [`Permission`]: Authorization requirement combining resource and operation
//!
//! The role matrix lives in [`crate::auth::permissions`].

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type CompanyId = Uuid;
pub type ProfileId = Uuid;
pub type CustomerId = Uuid;
pub type SupplierId = Uuid;
pub type CategoryId = Uuid;
pub type ProductId = Uuid;
pub type VariantId = Uuid;
pub type TechnicianId = Uuid;
pub type RepairOrderId = Uuid;
pub type RepairItemId = Uuid;
pub type SaleId = Uuid;
pub type QuoteId = Uuid;
pub type PurchaseOrderId = Uuid;
pub type CashOpeningId = Uuid;
pub type NotificationId = Uuid;
pub type NoteId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Company,
    Profiles,
    Customers,
    Suppliers,
    Inventory,
    Technicians,
    Repairs,
    RepairPayments,
    Sales,
    Quotes,
    PurchaseOrders,
    CashRegister,
    Reports,
    Notes,
    Notifications,
}

// Permission types for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Allow(Resource, Operation),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Company => "company",
            Resource::Profiles => "profiles",
            Resource::Customers => "customers",
            Resource::Suppliers => "suppliers",
            Resource::Inventory => "inventory",
            Resource::Technicians => "technicians",
            Resource::Repairs => "repair orders",
            Resource::RepairPayments => "repair payments",
            Resource::Sales => "sales",
            Resource::Quotes => "quotes",
            Resource::PurchaseOrders => "purchase orders",
            Resource::CashRegister => "the cash register",
            Resource::Reports => "reports",
            Resource::Notes => "internal notes",
            Resource::Notifications => "notifications",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbrev_uuid_takes_first_eight_chars() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
