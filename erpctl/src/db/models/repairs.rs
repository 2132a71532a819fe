//! Database models for repair orders and their child rows.

use super::clean;
use crate::api::models::repairs::{RepairOrderCreate, RepairOrderUpdate};
use crate::cash::PaymentMethod;
use crate::repairs::RepairStatus;
use crate::totals::{LineInput, round_money};
use crate::types::{CompanyId, CustomerId, ProductId, ProfileId, RepairItemId, RepairOrderId, TechnicianId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RepairOrderCreateDBRequest {
    pub customer_id: CustomerId,
    pub technician_id: Option<TechnicianId>,
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub reported_issue: String,
    pub diagnosis: Option<String>,
    pub labor_cost: Decimal,
    pub estimated_delivery: Option<NaiveDate>,
    pub created_by: Option<ProfileId>,
}

impl RepairOrderCreateDBRequest {
    pub fn new(api: RepairOrderCreate, created_by: ProfileId) -> Self {
        Self {
            customer_id: api.customer_id,
            technician_id: api.technician_id,
            device_type: api.device_type.trim().to_string(),
            brand: clean(api.brand),
            model: clean(api.model),
            serial_number: clean(api.serial_number),
            reported_issue: api.reported_issue.trim().to_string(),
            diagnosis: clean(api.diagnosis),
            labor_cost: round_money(api.labor_cost.unwrap_or_default()),
            estimated_delivery: api.estimated_delivery,
            created_by: Some(created_by),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RepairOrderUpdateDBRequest {
    pub technician_id: Option<TechnicianId>,
    pub device_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub reported_issue: Option<String>,
    pub diagnosis: Option<String>,
    pub labor_cost: Option<Decimal>,
    pub estimated_delivery: Option<NaiveDate>,
}

impl From<RepairOrderUpdate> for RepairOrderUpdateDBRequest {
    fn from(api: RepairOrderUpdate) -> Self {
        Self {
            technician_id: api.technician_id,
            device_type: clean(api.device_type),
            brand: clean(api.brand),
            model: clean(api.model),
            serial_number: clean(api.serial_number),
            reported_issue: clean(api.reported_issue),
            diagnosis: clean(api.diagnosis),
            labor_cost: api.labor_cost.map(round_money),
            estimated_delivery: api.estimated_delivery,
        }
    }
}

/// Repair order joined with its customer and technician names.
#[derive(Debug, Clone, FromRow)]
pub struct RepairOrderDBResponse {
    pub id: RepairOrderId,
    pub company_id: CompanyId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub technician_id: Option<TechnicianId>,
    pub technician_name: Option<String>,
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub reported_issue: String,
    pub diagnosis: Option<String>,
    pub status: RepairStatus,
    pub labor_cost: Decimal,
    pub parts_cost: Decimal,
    pub total_cost: Decimal,
    pub estimated_delivery: Option<NaiveDate>,
    pub received_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepairOrderDBResponse {
    /// Brand, model and device type as one line, e.g. `Apple iPhone 12 (Phone)`.
    pub fn device_label(&self) -> String {
        let name = [self.brand.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.device_type.clone()
        } else {
            format!("{name} ({})", self.device_type)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepairItemCreateDBRequest {
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct RepairItemDBResponse {
    pub id: RepairItemId,
    pub company_id: CompanyId,
    pub repair_order_id: RepairOrderId,
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepairItemDBResponse {
    pub fn line(&self) -> LineInput {
        LineInput {
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepairPaymentCreateDBRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub received_by: Option<ProfileId>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RepairPaymentDBResponse {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub repair_order_id: RepairOrderId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub received_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RepairNoteDBResponse {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub repair_order_id: RepairOrderId,
    pub author_id: Option<ProfileId>,
    pub author_name: Option<String>,
    pub body: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}
