//! Database models for sales.

use crate::api::models::sales::SaleStatus;
use crate::cash::PaymentMethod;
use crate::totals::DocumentTotals;
use crate::types::{CompanyId, CustomerId, ProductId, ProfileId, SaleId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SaleCreateDBRequest {
    pub customer_id: Option<CustomerId>,
    pub payment_method: PaymentMethod,
    pub totals: DocumentTotals,
    pub notes: Option<String>,
    pub created_by: Option<ProfileId>,
}

/// A priced line, snapshotting the product name at the time of sale.
#[derive(Debug, Clone)]
pub struct SaleItemCreateDBRequest {
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct SaleDBResponse {
    pub id: SaleId,
    pub company_id: CompanyId,
    pub sale_number: String,
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SaleItemDBResponse {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}
