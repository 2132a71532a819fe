//! Database models for suppliers.

use super::clean;
use crate::api::models::suppliers::{SupplierCreate, SupplierUpdate};
use crate::types::{CompanyId, SupplierId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct SupplierCreateDBRequest {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<SupplierCreate> for SupplierCreateDBRequest {
    fn from(api: SupplierCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
            contact_name: clean(api.contact_name),
            email: clean(api.email).map(|e| e.to_lowercase()),
            phone: clean(api.phone),
            address: clean(api.address),
            notes: clean(api.notes),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SupplierUpdateDBRequest {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<SupplierUpdate> for SupplierUpdateDBRequest {
    fn from(api: SupplierUpdate) -> Self {
        Self {
            name: clean(api.name),
            contact_name: clean(api.contact_name),
            email: clean(api.email).map(|e| e.to_lowercase()),
            phone: clean(api.phone),
            address: clean(api.address),
            notes: clean(api.notes),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SupplierDBResponse {
    pub id: SupplierId,
    pub company_id: CompanyId,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
