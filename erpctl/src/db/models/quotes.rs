//! Database models for quotes.

use crate::api::models::quotes::QuoteStatus;
use crate::totals::DocumentTotals;
use crate::types::{CompanyId, CustomerId, ProductId, ProfileId, QuoteId, SaleId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QuoteCreateDBRequest {
    pub customer_id: Option<CustomerId>,
    pub valid_until: Option<NaiveDate>,
    pub totals: DocumentTotals,
    /// Percent the totals were computed with; reused on conversion
    pub tax_rate: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<ProfileId>,
}

#[derive(Debug, Clone)]
pub struct QuoteItemCreateDBRequest {
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuoteDBResponse {
    pub id: QuoteId,
    pub company_id: CompanyId,
    pub quote_number: String,
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub status: QuoteStatus,
    pub valid_until: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub sale_id: Option<SaleId>,
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuoteItemDBResponse {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub quote_id: QuoteId,
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}
