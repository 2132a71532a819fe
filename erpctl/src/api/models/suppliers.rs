//! API request/response models for suppliers.

use super::pagination::Pagination;
use super::require_text;
use crate::db::models::suppliers::SupplierDBResponse;
use crate::errors::Result;
use crate::types::SupplierId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SupplierCreate {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl SupplierCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Supplier name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl SupplierUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) => require_text("Supplier name", name),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SupplierResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SupplierId,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SupplierDBResponse> for SupplierResponse {
    fn from(db: SupplierDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            contact_name: db.contact_name,
            email: db.email,
            phone: db.phone,
            address: db.address,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSuppliersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name, contact or email
    pub search: Option<String>,
}
