//! API request/response models for customers.

use super::pagination::Pagination;
use super::require_text;
use crate::db::models::customers::CustomerDBResponse;
use crate::errors::Result;
use crate::types::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerCreate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// National ID or tax number
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl CustomerCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Customer name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl CustomerUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) => require_text("Customer name", name),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomerDBResponse> for CustomerResponse {
    fn from(db: CustomerDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            phone: db.phone,
            document_id: db.document_id,
            address: db.address,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCustomersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name, email, phone or document id
    pub search: Option<String>,
}
