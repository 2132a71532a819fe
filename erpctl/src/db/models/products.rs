//! Database models for products, variants and stock movements.

use super::clean;
use crate::api::models::products::{ProductCreate, ProductUpdate, VariantCreate};
use crate::inventory::MovementReason;
use crate::totals::round_money;
use crate::types::{CategoryId, CompanyId, ProductId, ProfileId, VariantId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Opening stock is not part of the insert; it is applied afterwards as an adjustment.
#[derive(Debug, Clone)]
pub struct ProductCreateDBRequest {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub min_stock: i32,
}

impl From<ProductCreate> for ProductCreateDBRequest {
    fn from(api: ProductCreate) -> Self {
        Self {
            category_id: api.category_id,
            name: api.name.trim().to_string(),
            sku: clean(api.sku),
            description: clean(api.description),
            cost_price: round_money(api.cost_price.unwrap_or_default()),
            sale_price: round_money(api.sale_price.unwrap_or_default()),
            min_stock: api.min_stock.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdateDBRequest {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub min_stock: Option<i32>,
    pub active: Option<bool>,
}

impl From<ProductUpdate> for ProductUpdateDBRequest {
    fn from(api: ProductUpdate) -> Self {
        Self {
            category_id: api.category_id,
            name: clean(api.name),
            sku: clean(api.sku),
            description: clean(api.description),
            cost_price: api.cost_price.map(round_money),
            sale_price: api.sale_price.map(round_money),
            min_stock: api.min_stock,
            active: api.active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductDBResponse {
    pub id: ProductId,
    pub company_id: CompanyId,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One stock change to apply and record.
#[derive(Debug, Clone)]
pub struct StockChange {
    pub product_id: ProductId,
    /// Signed number of units
    pub delta: i32,
    pub reason: MovementReason,
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    pub actor: Option<ProfileId>,
}

impl StockChange {
    pub fn new(product_id: ProductId, delta: i32, reason: MovementReason) -> Self {
        Self {
            product_id,
            delta,
            reason,
            reference_id: None,
            note: None,
            actor: None,
        }
    }

    pub fn reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = clean(note);
        self
    }

    pub fn actor(mut self, actor: ProfileId) -> Self {
        self.actor = Some(actor);
        self
    }
}

/// Product row after a stock change, with the values a caller needs for follow-ups.
#[derive(Debug, Clone, FromRow)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub name: String,
    pub stock: i32,
    pub min_stock: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct StockMovementDBResponse {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub stock_after: i32,
    pub reason: MovementReason,
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VariantCreateDBRequest {
    pub name: String,
    pub sku: Option<String>,
    pub sale_price: Option<Decimal>,
    pub stock: i32,
}

impl From<VariantCreate> for VariantCreateDBRequest {
    fn from(api: VariantCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
            sku: clean(api.sku),
            sale_price: api.sale_price.map(round_money),
            stock: api.stock.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VariantDBResponse {
    pub id: VariantId,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub sale_price: Option<Decimal>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
