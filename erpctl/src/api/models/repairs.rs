//! API request/response models for repair orders, their items, payments and notes.

use super::pagination::Pagination;
use super::require_text;
use crate::cash::PaymentMethod;
use crate::db::models::repairs::{RepairItemDBResponse, RepairNoteDBResponse, RepairOrderDBResponse, RepairPaymentDBResponse};
use crate::errors::{Error, Result};
use crate::repairs::{PaymentSummary, RepairStatus};
use crate::totals::{check_amount, check_quantity, round_money};
use crate::types::{CustomerId, ProductId, ProfileId, RepairItemId, RepairOrderId, TechnicianId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

fn check_labor(labor: Option<Decimal>) -> Result<()> {
    match labor {
        Some(l) => check_amount("Labor cost", l),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairOrderCreate {
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: CustomerId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub technician_id: Option<TechnicianId>,
    /// Phone, laptop, console, ...
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    /// Problem as described by the customer
    pub reported_issue: String,
    pub diagnosis: Option<String>,
    #[schema(value_type = Option<String>)]
    pub labor_cost: Option<Decimal>,
    pub estimated_delivery: Option<NaiveDate>,
}

impl RepairOrderCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Device type", &self.device_type)?;
        require_text("Reported issue", &self.reported_issue)?;
        check_labor(self.labor_cost)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RepairOrderUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub technician_id: Option<TechnicianId>,
    pub device_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub reported_issue: Option<String>,
    pub diagnosis: Option<String>,
    #[schema(value_type = Option<String>)]
    pub labor_cost: Option<Decimal>,
    pub estimated_delivery: Option<NaiveDate>,
}

impl RepairOrderUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(device_type) = &self.device_type {
            require_text("Device type", device_type)?;
        }
        if let Some(issue) = &self.reported_issue {
            require_text("Reported issue", issue)?;
        }
        check_labor(self.labor_cost)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    pub status: RepairStatus,
    /// Recorded as an internal note on the order
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairOrderResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RepairOrderId,
    pub order_number: String,
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: CustomerId,
    pub customer_name: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub technician_id: Option<TechnicianId>,
    pub technician_name: Option<String>,
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub reported_issue: String,
    pub diagnosis: Option<String>,
    pub status: RepairStatus,
    #[schema(value_type = String)]
    pub labor_cost: Decimal,
    #[schema(value_type = String)]
    pub parts_cost: Decimal,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub estimated_delivery: Option<NaiveDate>,
    pub received_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RepairOrderDBResponse> for RepairOrderResponse {
    fn from(db: RepairOrderDBResponse) -> Self {
        Self {
            id: db.id,
            order_number: db.order_number,
            customer_id: db.customer_id,
            customer_name: db.customer_name,
            technician_id: db.technician_id,
            technician_name: db.technician_name,
            device_type: db.device_type,
            brand: db.brand,
            model: db.model,
            serial_number: db.serial_number,
            reported_issue: db.reported_issue,
            diagnosis: db.diagnosis,
            status: db.status,
            labor_cost: db.labor_cost,
            parts_cost: db.parts_cost,
            total_cost: db.total_cost,
            estimated_delivery: db.estimated_delivery,
            received_at: db.received_at,
            completed_at: db.completed_at,
            delivered_at: db.delivered_at,
            cancelled_at: db.cancelled_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// A repair order with its lines, payments and balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairOrderDetail {
    #[serde(flatten)]
    pub order: RepairOrderResponse,
    pub items: Vec<RepairItemResponse>,
    pub payments: Vec<RepairPaymentResponse>,
    pub payment: PaymentSummary,
}

#[serde_as]
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRepairsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on order number, device, serial number or customer name
    pub search: Option<String>,

    pub status: Option<RepairStatus>,

    /// Exclude delivered and cancelled orders
    #[serde(default)]
    #[serde_as(as = "DisplayFromStr")]
    pub active_only: bool,

    #[param(value_type = Option<String>, format = "uuid")]
    pub customer_id: Option<CustomerId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub technician_id: Option<TechnicianId>,
}

/// A part or service line. With a `product_id`, description and price default to the product's.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairItemCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub product_id: Option<ProductId>,
    pub description: Option<String>,
    pub quantity: i32,
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
}

impl RepairItemCreate {
    pub fn validate(&self) -> Result<()> {
        check_quantity(self.quantity)?;
        if let Some(price) = self.unit_price {
            check_amount("Unit price", price)?;
        }
        if self.product_id.is_none() {
            match &self.description {
                Some(description) => require_text("Item description", description)?,
                None => return Err(Error::bad_request("Item needs a product or a description")),
            }
            if self.unit_price.is_none() {
                return Err(Error::bad_request("Unit price is required for items without a product"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RepairItemId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
    /// Stock has been deducted for this item
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<RepairItemDBResponse> for RepairItemResponse {
    fn from(db: RepairItemDBResponse) -> Self {
        Self {
            // Stored values fit NUMERIC(12, 2) and INTEGER, far below the Decimal range
            line_total: round_money(db.unit_price * Decimal::from(db.quantity)),
            id: db.id,
            product_id: db.product_id,
            description: db.description,
            quantity: db.quantity,
            unit_price: db.unit_price,
            used: db.used,
            used_at: db.used_at,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairPaymentCreate {
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub method: PaymentMethod,
    /// Card slip or transfer reference
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairPaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub received_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
}

impl From<RepairPaymentDBResponse> for RepairPaymentResponse {
    fn from(db: RepairPaymentDBResponse) -> Self {
        Self {
            id: db.id,
            amount: db.amount,
            method: db.method,
            reference: db.reference,
            received_by: db.received_by,
            created_at: db.created_at,
        }
    }
}

/// Payment as recorded, with the order's balance afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairPaymentReceipt {
    pub payment: RepairPaymentResponse,
    pub summary: PaymentSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairNoteCreate {
    pub body: String,
    /// Internal notes are hidden from customer-facing documents (default: true)
    pub is_internal: Option<bool>,
}

impl RepairNoteCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Note", &self.body)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepairNoteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub author_id: Option<ProfileId>,
    pub author_name: Option<String>,
    pub body: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

impl From<RepairNoteDBResponse> for RepairNoteResponse {
    fn from(db: RepairNoteDBResponse) -> Self {
        Self {
            id: db.id,
            author_id: db.author_id,
            author_name: db.author_name,
            body: db.body,
            is_internal: db.is_internal,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockReversalResponse {
    /// Items flipped back to unused, with their stock restored
    pub restored: Vec<RepairItemResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: bool, description: Option<&str>, quantity: i32, price: Option<&str>) -> RepairItemCreate {
        RepairItemCreate {
            product_id: product.then(Uuid::new_v4),
            description: description.map(str::to_string),
            quantity,
            unit_price: price.map(|p| p.parse().unwrap()),
        }
    }

    #[test]
    fn product_items_may_omit_description_and_price() {
        assert!(item(true, None, 1, None).validate().is_ok());
    }

    #[test]
    fn service_items_need_description_and_price() {
        assert!(item(false, Some("Cleaning"), 1, Some("15")).validate().is_ok());
        assert!(item(false, None, 1, Some("15")).validate().is_err());
        assert!(item(false, Some("  "), 1, Some("15")).validate().is_err());
        assert!(item(false, Some("Cleaning"), 1, None).validate().is_err());
    }

    #[test]
    fn quantities_and_prices_are_checked() {
        assert!(item(true, None, 0, None).validate().is_err());
        assert!(item(true, None, 1, Some("-0.01")).validate().is_err());
    }

    #[test]
    fn create_requires_device_and_issue() {
        let mut order = RepairOrderCreate {
            customer_id: Uuid::new_v4(),
            technician_id: None,
            device_type: "Phone".to_string(),
            brand: None,
            model: None,
            serial_number: None,
            reported_issue: "Cracked screen".to_string(),
            diagnosis: None,
            labor_cost: None,
            estimated_delivery: None,
        };
        assert!(order.validate().is_ok());
        order.reported_issue = String::new();
        assert!(order.validate().is_err());
    }
}
