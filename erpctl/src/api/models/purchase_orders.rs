//! API request/response models for purchase orders.

use super::pagination::Pagination;
use crate::db::models::purchase_orders::{PurchaseOrderDBResponse, PurchaseOrderItemDBResponse};
use crate::errors::{Error, Result};
use crate::totals::{check_amount, check_quantity, check_tax_rate};
use crate::types::{ProductId, ProfileId, PurchaseOrderId, SupplierId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    /// Sent to the supplier
    Ordered,
    /// Goods arrived; stock was added
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Ordered => "ordered",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses an order may be in to move to `to`.
    pub fn allowed_sources(to: PurchaseOrderStatus) -> &'static [PurchaseOrderStatus] {
        match to {
            PurchaseOrderStatus::Draft => &[],
            PurchaseOrderStatus::Ordered => &[PurchaseOrderStatus::Draft],
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled => {
                &[PurchaseOrderStatus::Draft, PurchaseOrderStatus::Ordered]
            }
        }
    }

    pub fn check_transition(self, to: PurchaseOrderStatus) -> Result<()> {
        if Self::allowed_sources(to).contains(&self) {
            Ok(())
        } else {
            Err(Error::bad_request(format!("Purchase order is {self} and cannot be marked {to}")))
        }
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderItemCreate {
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderCreate {
    #[schema(value_type = String, format = "uuid")]
    pub supplier_id: SupplierId,
    pub expected_date: Option<NaiveDate>,
    pub items: Vec<PurchaseOrderItemCreate>,
    /// Percent charged by the supplier (default: 0)
    #[schema(value_type = Option<String>)]
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
}

impl PurchaseOrderCreate {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::bad_request("A purchase order needs at least one item"));
        }
        for item in &self.items {
            check_quantity(item.quantity)?;
            check_amount("Unit cost", item.unit_cost)?;
        }
        if let Some(rate) = self.tax_rate {
            check_tax_rate(rate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PurchaseOrderId,
    pub order_number: String,
    #[schema(value_type = String, format = "uuid")]
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub status: PurchaseOrderStatus,
    pub expected_date: Option<NaiveDate>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub notes: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PurchaseOrderDBResponse> for PurchaseOrderResponse {
    fn from(db: PurchaseOrderDBResponse) -> Self {
        Self {
            id: db.id,
            order_number: db.order_number,
            supplier_id: db.supplier_id,
            supplier_name: db.supplier_name,
            status: db.status,
            expected_date: db.expected_date,
            subtotal: db.subtotal,
            tax: db.tax,
            total: db.total,
            notes: db.notes,
            ordered_at: db.ordered_at,
            received_at: db.received_at,
            cancelled_at: db.cancelled_at,
            created_by: db.created_by,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_cost: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl From<PurchaseOrderItemDBResponse> for PurchaseOrderItemResponse {
    fn from(db: PurchaseOrderItemDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            product_name: db.product_name,
            quantity: db.quantity,
            unit_cost: db.unit_cost,
            line_total: db.line_total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrderResponse,
    pub items: Vec<PurchaseOrderItemResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPurchaseOrdersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on order number or supplier name
    pub search: Option<String>,

    pub status: Option<PurchaseOrderStatus>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub supplier_id: Option<SupplierId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use PurchaseOrderStatus::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        assert!(Draft.check_transition(Ordered).is_ok());
        assert!(Ordered.check_transition(Received).is_ok());
        assert!(Draft.check_transition(Received).is_ok());
        assert!(Ordered.check_transition(Cancelled).is_ok());

        assert!(Ordered.check_transition(Ordered).is_err());
        assert!(Received.check_transition(Cancelled).is_err());
        assert!(Cancelled.check_transition(Received).is_err());
        assert!(Ordered.check_transition(Draft).is_err());
    }

    #[test]
    fn transition_error_names_both_statuses() {
        let err = Received.check_transition(Cancelled).unwrap_err();
        assert_eq!(err.user_message(), "Purchase order is received and cannot be marked cancelled");
    }
}
