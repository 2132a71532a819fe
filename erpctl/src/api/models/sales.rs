//! API request/response models for point-of-sale sales.

use super::pagination::{DateRange, Pagination};
use crate::cash::PaymentMethod;
use crate::db::models::sales::{SaleDBResponse, SaleItemDBResponse};
use crate::errors::{Error, Result};
use crate::totals::{check_amount, check_quantity, check_tax_rate};
use crate::types::{CustomerId, ProductId, ProfileId, SaleId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    /// Cancelled after the fact; stock was returned
    Voided,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleItemCreate {
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub quantity: i32,
    /// Defaults to the product's sale price
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleCreate {
    /// Walk-in sales have no customer
    #[schema(value_type = Option<String>, format = "uuid")]
    pub customer_id: Option<CustomerId>,
    pub payment_method: PaymentMethod,
    pub items: Vec<SaleItemCreate>,
    /// Absolute discount applied before tax
    #[schema(value_type = Option<String>)]
    pub discount: Option<Decimal>,
    /// Percent; defaults to the company's tax rate
    #[schema(value_type = Option<String>)]
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
}

impl SaleCreate {
    /// Shape checks only; prices and stock are checked against the products.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::bad_request("A sale needs at least one item"));
        }
        for item in &self.items {
            check_quantity(item.quantity)?;
            if let Some(price) = item.unit_price {
                check_amount("Unit price", price)?;
            }
        }
        if let Some(discount) = self.discount {
            check_amount("Discount", discount)?;
        }
        if let Some(rate) = self.tax_rate {
            check_tax_rate(rate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SaleId,
    pub sale_number: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
}

impl From<SaleDBResponse> for SaleResponse {
    fn from(db: SaleDBResponse) -> Self {
        Self {
            id: db.id,
            sale_number: db.sale_number,
            customer_id: db.customer_id,
            customer_name: db.customer_name,
            status: db.status,
            payment_method: db.payment_method,
            subtotal: db.subtotal,
            discount: db.discount,
            tax: db.tax,
            total: db.total,
            notes: db.notes,
            created_by: db.created_by,
            created_at: db.created_at,
            voided_at: db.voided_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl From<SaleItemDBResponse> for SaleItemResponse {
    fn from(db: SaleItemDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            description: db.description,
            quantity: db.quantity,
            unit_price: db.unit_price,
            line_total: db.line_total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: SaleResponse,
    pub items: Vec<SaleItemResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSalesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde(flatten)]
    #[param(inline)]
    pub range: DateRange,

    /// Case-insensitive substring match on sale number or customer name
    pub search: Option<String>,

    pub status: Option<SaleStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VoidSaleRequest {
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(items: Vec<SaleItemCreate>) -> SaleCreate {
        SaleCreate {
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            items,
            discount: None,
            tax_rate: None,
            notes: None,
        }
    }

    #[test]
    fn empty_sales_are_rejected() {
        let err = sale(vec![]).validate().unwrap_err();
        assert_eq!(err.user_message(), "A sale needs at least one item");
    }

    #[test]
    fn item_quantities_must_be_positive() {
        let item = SaleItemCreate {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price: None,
        };
        assert!(sale(vec![item.clone()]).validate().is_err());
        assert!(sale(vec![SaleItemCreate { quantity: 2, ..item }]).validate().is_ok());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(SaleStatus::Voided).unwrap(), "voided");
    }
}
