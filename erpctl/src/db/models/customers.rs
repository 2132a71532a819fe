//! Database models for customers.

use super::clean;
use crate::api::models::customers::{CustomerCreate, CustomerUpdate};
use crate::types::{CompanyId, CustomerId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CustomerCreateDBRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<CustomerCreate> for CustomerCreateDBRequest {
    fn from(api: CustomerCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
            email: clean(api.email).map(|e| e.to_lowercase()),
            phone: clean(api.phone),
            document_id: clean(api.document_id),
            address: clean(api.address),
            notes: clean(api.notes),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CustomerUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<CustomerUpdate> for CustomerUpdateDBRequest {
    fn from(api: CustomerUpdate) -> Self {
        Self {
            name: clean(api.name),
            email: clean(api.email).map(|e| e.to_lowercase()),
            phone: clean(api.phone),
            document_id: clean(api.document_id),
            address: clean(api.address),
            notes: clean(api.notes),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CustomerDBResponse {
    pub id: CustomerId,
    pub company_id: CompanyId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
