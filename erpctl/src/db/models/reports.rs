//! Database rows read by reports and exports.

use crate::repairs::RepairStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// One repair order as exported, with its payment total.
#[derive(Debug, Clone, FromRow)]
pub struct RepairExportRow {
    pub order_number: String,
    pub received_at: DateTime<Utc>,
    pub customer_name: String,
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: RepairStatus,
    pub technician_name: Option<String>,
    pub labor_cost: Decimal,
    pub parts_cost: Decimal,
    pub total_cost: Decimal,
    pub paid: Decimal,
    pub delivered_at: Option<DateTime<Utc>>,
}
