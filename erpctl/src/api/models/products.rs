//! API request/response models for products, variants and stock movements.

use super::pagination::Pagination;
use super::require_text;
use crate::db::models::products::{ProductDBResponse, StockMovementDBResponse, VariantDBResponse};
use crate::errors::{Error, Result};
use crate::inventory::{MovementReason, is_low_stock};
use crate::totals::{MAX_QUANTITY, check_amount};
use crate::types::{CategoryId, ProductId, ProfileId, VariantId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

fn check_price(field: &str, price: Option<Decimal>) -> Result<()> {
    match price {
        Some(p) => check_amount(field, p),
        None => Ok(()),
    }
}

fn check_count(field: &str, value: Option<i32>) -> Result<()> {
    match value {
        Some(v) if v < 0 => Err(Error::bad_request(format!("{field} cannot be negative"))),
        Some(v) if v > MAX_QUANTITY => Err(Error::bad_request(format!("{field} cannot exceed {MAX_QUANTITY}"))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCreate {
    pub name: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    pub sku: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub sale_price: Option<Decimal>,
    /// Opening stock, recorded as an adjustment movement
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
}

impl ProductCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Product name", &self.name)?;
        check_price("Cost price", self.cost_price)?;
        check_price("Sale price", self.sale_price)?;
        check_count("Stock", self.stock)?;
        check_count("Minimum stock", self.min_stock)
    }
}

/// Stock is not editable here; use a stock adjustment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductUpdate {
    pub name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    pub sku: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub sale_price: Option<Decimal>,
    pub min_stock: Option<i32>,
    pub active: Option<bool>,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_text("Product name", name)?;
        }
        check_price("Cost price", self.cost_price)?;
        check_price("Sale price", self.sale_price)?;
        check_count("Minimum stock", self.min_stock)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProductId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
    #[schema(value_type = String)]
    pub sale_price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub low_stock: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductDBResponse> for ProductResponse {
    fn from(db: ProductDBResponse) -> Self {
        Self {
            low_stock: is_low_stock(db.stock, db.min_stock),
            id: db.id,
            category_id: db.category_id,
            category_name: db.category_name,
            name: db.name,
            sku: db.sku,
            description: db.description,
            cost_price: db.cost_price,
            sale_price: db.sale_price,
            stock: db.stock,
            min_stock: db.min_stock,
            active: db.active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProductsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name, SKU or description
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,

    /// Include deactivated products
    #[serde(default)]
    #[serde_as(as = "DisplayFromStr")]
    pub include_inactive: bool,
}

/// Manual stock correction. Positive adds units, negative removes them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockAdjustment {
    pub quantity: i32,
    pub note: Option<String>,
}

impl StockAdjustment {
    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(Error::bad_request("Adjustment quantity cannot be zero"));
        }
        if self.quantity.unsigned_abs() > MAX_QUANTITY.unsigned_abs() {
            return Err(Error::bad_request(format!("Adjustment cannot exceed {MAX_QUANTITY} units")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockMovementResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    /// Signed change in units
    pub quantity: i32,
    pub stock_after: i32,
    pub reason: MovementReason,
    /// Sale, repair order or purchase order that caused the movement
    #[schema(value_type = Option<String>, format = "uuid")]
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
}

impl From<StockMovementDBResponse> for StockMovementResponse {
    fn from(db: StockMovementDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            quantity: db.quantity,
            stock_after: db.stock_after,
            reason: db.reason,
            reference_id: db.reference_id,
            note: db.note,
            created_by: db.created_by,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantCreate {
    pub name: String,
    pub sku: Option<String>,
    /// Overrides the product's sale price when set
    #[schema(value_type = Option<String>)]
    pub sale_price: Option<Decimal>,
    pub stock: Option<i32>,
}

impl VariantCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Variant name", &self.name)?;
        check_price("Sale price", self.sale_price)?;
        check_count("Stock", self.stock)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: VariantId,
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    #[schema(value_type = Option<String>)]
    pub sale_price: Option<Decimal>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VariantDBResponse> for VariantResponse {
    fn from(db: VariantDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            name: db.name,
            sku: db.sku,
            sale_price: db.sale_price,
            stock: db.stock,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_negative_numbers_and_blank_names() {
        let mut product = ProductCreate {
            name: "Battery".to_string(),
            category_id: None,
            sku: None,
            description: None,
            cost_price: Some("10".parse().unwrap()),
            sale_price: Some("18".parse().unwrap()),
            stock: Some(3),
            min_stock: None,
        };
        assert!(product.validate().is_ok());

        product.stock = Some(-1);
        assert!(product.validate().is_err());

        product.stock = Some(0);
        product.sale_price = Some("-1".parse().unwrap());
        assert!(product.validate().is_err());

        product.sale_price = None;
        product.name = "   ".to_string();
        assert!(product.validate().is_err());
    }

    #[test]
    fn zero_adjustment_is_rejected() {
        let adj = StockAdjustment { quantity: 0, note: None };
        assert!(adj.validate().is_err());
        let adj = StockAdjustment {
            quantity: -2,
            note: Some("Broken in storage".to_string()),
        };
        assert!(adj.validate().is_ok());
    }
}
