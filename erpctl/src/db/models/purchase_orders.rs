//! Database models for purchase orders.

use crate::api::models::purchase_orders::PurchaseOrderStatus;
use crate::totals::DocumentTotals;
use crate::types::{CompanyId, ProductId, ProfileId, PurchaseOrderId, SupplierId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PurchaseOrderCreateDBRequest {
    pub supplier_id: SupplierId,
    pub expected_date: Option<NaiveDate>,
    pub totals: DocumentTotals,
    pub notes: Option<String>,
    pub created_by: Option<ProfileId>,
}

#[derive(Debug, Clone)]
pub struct PurchaseOrderItemCreateDBRequest {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct PurchaseOrderDBResponse {
    pub id: PurchaseOrderId,
    pub company_id: CompanyId,
    pub order_number: String,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub status: PurchaseOrderStatus,
    pub expected_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PurchaseOrderItemDBResponse {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub purchase_order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub line_total: Decimal,
}
