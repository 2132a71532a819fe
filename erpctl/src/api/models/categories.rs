//! API request/response models for product categories.

use super::require_text;
use crate::db::models::categories::CategoryDBResponse;
use crate::errors::Result;
use crate::types::CategoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryCreate {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Category name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) => require_text("Category name", name),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    /// Active products in this category
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryDBResponse> for CategoryResponse {
    fn from(db: CategoryDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            product_count: db.product_count,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
