//! Database models for companies (tenants).

use crate::api::models::companies::CompanyUpdate;
use crate::types::CompanyId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CompanyCreateDBRequest {
    pub name: String,
    pub email: Option<String>,
    pub currency: String,
}

impl CompanyCreateDBRequest {
    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            name: name.into(),
            email,
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompanyUpdateDBRequest {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency: Option<String>,
    pub tax_rate: Option<Decimal>,
}

impl From<CompanyUpdate> for CompanyUpdateDBRequest {
    fn from(api: CompanyUpdate) -> Self {
        Self {
            name: api.name,
            tax_id: api.tax_id,
            email: api.email,
            phone: api.phone,
            address: api.address,
            currency: api.currency.map(|c| c.to_uppercase()),
            tax_rate: api.tax_rate,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CompanyDBResponse {
    pub id: CompanyId,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency: String,
    pub tax_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
