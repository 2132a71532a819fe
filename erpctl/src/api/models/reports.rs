//! API models for reports and the dashboard.
//!
//! Aggregate rows derive `FromRow` directly: they are read-only projections with no separate
//! storage shape.

use crate::cash::PaymentMethod;
use crate::repairs::RepairStatus;
use crate::types::ProductId;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub count: i64,
    #[schema(value_type = String)]
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct DailyTotal {
    pub day: NaiveDate,
    pub count: i64,
    #[schema(value_type = String)]
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct TopProduct {
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub name: String,
    pub units: i64,
    #[schema(value_type = String)]
    pub revenue: Decimal,
}

/// Totals over completed sales in a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct SalesTotals {
    pub sale_count: i64,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    /// Average total per sale; zero when there are no sales
    #[schema(value_type = String)]
    pub average_ticket: Decimal,
    pub voided_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesSummaryResponse {
    pub from: DateTime<Utc>,
    /// Exclusive
    pub to: DateTime<Utc>,
    pub totals: SalesTotals,
    pub by_method: Vec<MethodTotal>,
    pub by_day: Vec<DailyTotal>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct StatusCount {
    pub status: RepairStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    /// Orders not yet delivered or cancelled, per status
    pub active_repairs: Vec<StatusCount>,
    pub active_repair_count: i64,
    /// Unpaid balance across orders that are not cancelled
    #[schema(value_type = String)]
    pub outstanding_balance: Decimal,
    pub low_stock_count: i64,
    pub sales_today: i64,
    #[schema(value_type = String)]
    pub sales_today_total: Decimal,
    pub register_open: bool,
    pub unread_notifications: i64,
}
