//! Database repository for products, their variants and the stock movement ledger.
//!
//! Stock only changes through [`Products::adjust_stock`], which applies a guarded increment and
//! writes the matching `stock_movements` row in the caller's transaction. The guard lives in the
//! `UPDATE` itself, so two concurrent deductions cannot both pass a stale check.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::{push_search, repository::Repository},
    models::products::{
        ProductCreateDBRequest, ProductDBResponse, ProductUpdateDBRequest, StockChange, StockLevel, StockMovementDBResponse,
        VariantCreateDBRequest, VariantDBResponse,
    },
};
use crate::types::{CategoryId, CompanyId, ProductId, VariantId, abbrev_uuid};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::{debug, instrument};

const SEARCH_COLUMNS: &[&str] = &["p.name", "p.sku", "p.description"];

const SELECT_PRODUCT: &str = "SELECT p.*, c.name AS category_name FROM products p LEFT JOIN categories c ON c.id = p.category_id";

/// Filter for listing products
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub include_inactive: bool,
}

impl ProductFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
            category_id: None,
            include_inactive: false,
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }
}

pub struct Products<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Products<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    fn filtered<'q>(&self, select: &str, filter: &'q ProductFilter) -> QueryBuilder<'q, Postgres> {
        let mut query = QueryBuilder::new(select);
        query.push(" WHERE p.deleted_at IS NULL AND p.company_id = ");
        query.push_bind(self.company_id);
        if !filter.include_inactive {
            query.push(" AND p.active");
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND p.category_id = ");
            query.push_bind(category_id);
        }
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ProductFilter) -> Result<i64> {
        let mut query = self.filtered("SELECT COUNT(*) FROM products p", filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Apply a signed stock change and record it in the movement ledger.
    ///
    /// Fails with [`DbError::InsufficientStock`] when the change would leave negative stock, and
    /// with [`DbError::NotFound`] when the product is not in this company. Deleted products still
    /// accept changes so that voids and reversals can restore their stock.
    #[instrument(
        skip(self, change),
        fields(product_id = %abbrev_uuid(&change.product_id), delta = change.delta, reason = change.reason.as_str()),
        err
    )]
    pub async fn adjust_stock(&mut self, change: &StockChange) -> Result<StockLevel> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products SET stock = stock + $3
            WHERE id = $1 AND company_id = $2 AND stock + $3 >= 0
            RETURNING id AS product_id, name, stock, min_stock
            "#,
        )
        .bind(change.product_id)
        .bind(self.company_id)
        .bind(change.delta)
        .fetch_optional(&mut *self.db)
        .await?;

        let Some(level) = level else {
            let current = sqlx::query_as::<_, (String, i32)>("SELECT name, stock FROM products WHERE id = $1 AND company_id = $2")
                .bind(change.product_id)
                .bind(self.company_id)
                .fetch_optional(&mut *self.db)
                .await?;
            return Err(match current {
                Some((product_name, available)) => DbError::InsufficientStock {
                    product_id: change.product_id,
                    product_name,
                    requested: change.delta.saturating_neg(),
                    available,
                },
                None => DbError::NotFound,
            });
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (company_id, product_id, quantity, stock_after, reason, reference_id, note, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(self.company_id)
        .bind(change.product_id)
        .bind(change.delta)
        .bind(level.stock)
        .bind(change.reason)
        .bind(change.reference_id)
        .bind(&change.note)
        .bind(change.actor)
        .execute(&mut *self.db)
        .await?;

        metrics::counter!("erpctl_stock_movements_total", "reason" => change.reason.as_str()).increment(1);
        debug!(stock_after = level.stock, "Stock adjusted");
        Ok(level)
    }

    /// Record the latest purchase cost.
    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&product_id), cost = %cost_price), err)]
    pub async fn set_cost_price(&mut self, product_id: ProductId, cost_price: Decimal) -> Result<()> {
        sqlx::query("UPDATE products SET cost_price = $3 WHERE id = $1 AND company_id = $2")
            .bind(product_id)
            .bind(self.company_id)
            .bind(cost_price)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Active products at or below their minimum stock, most depleted first.
    #[instrument(skip(self), err)]
    pub async fn list_low_stock(&mut self) -> Result<Vec<ProductDBResponse>> {
        let products = sqlx::query_as::<_, ProductDBResponse>(&format!(
            "{SELECT_PRODUCT} WHERE p.company_id = $1 AND p.deleted_at IS NULL AND p.active AND p.stock <= p.min_stock \
             ORDER BY p.stock - p.min_stock, p.name"
        ))
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&product_id)), err)]
    pub async fn list_movements(&mut self, product_id: ProductId, skip: i64, limit: i64) -> Result<Vec<StockMovementDBResponse>> {
        let movements = sqlx::query_as::<_, StockMovementDBResponse>(
            r#"
            SELECT * FROM stock_movements
            WHERE product_id = $1 AND company_id = $2
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(product_id)
        .bind(self.company_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(movements)
    }

    pub async fn count_movements(&mut self, product_id: ProductId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = $1 AND company_id = $2")
            .bind(product_id)
            .bind(self.company_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(product_id = %abbrev_uuid(&product_id)), err)]
    pub async fn create_variant(&mut self, product_id: ProductId, request: &VariantCreateDBRequest) -> Result<VariantDBResponse> {
        let variant = sqlx::query_as::<_, VariantDBResponse>(
            r#"
            INSERT INTO product_variants (company_id, product_id, name, sku, sale_price, stock)
            SELECT company_id, id, $3, $4, $5, $6 FROM products
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(self.company_id)
        .bind(&request.name)
        .bind(&request.sku)
        .bind(request.sale_price)
        .bind(request.stock)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(variant)
    }

    pub async fn list_variants(&mut self, product_id: ProductId) -> Result<Vec<VariantDBResponse>> {
        let variants =
            sqlx::query_as::<_, VariantDBResponse>("SELECT * FROM product_variants WHERE product_id = $1 AND company_id = $2 ORDER BY name")
                .bind(product_id)
                .bind(self.company_id)
                .fetch_all(&mut *self.db)
                .await?;
        Ok(variants)
    }

    #[instrument(skip(self), fields(variant_id = %abbrev_uuid(&variant_id)), err)]
    pub async fn delete_variant(&mut self, product_id: ProductId, variant_id: VariantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM product_variants WHERE id = $1 AND product_id = $2 AND company_id = $3")
            .bind(variant_id)
            .bind(product_id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Products<'c> {
    type CreateRequest = ProductCreateDBRequest;
    type UpdateRequest = ProductUpdateDBRequest;
    type Response = ProductDBResponse;
    type Id = ProductId;
    type Filter = ProductFilter;

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&self.company_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let product = sqlx::query_as::<_, ProductDBResponse>(
            r#"
            WITH inserted AS (
                INSERT INTO products (company_id, category_id, name, sku, description, cost_price, sale_price, min_stock)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT p.*, c.name AS category_name FROM inserted p LEFT JOIN categories c ON c.id = p.category_id
            "#,
        )
        .bind(self.company_id)
        .bind(request.category_id)
        .bind(&request.name)
        .bind(&request.sku)
        .bind(&request.description)
        .bind(request.cost_price)
        .bind(request.sale_price)
        .bind(request.min_stock)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let product = sqlx::query_as::<_, ProductDBResponse>(&format!(
            "{SELECT_PRODUCT} WHERE p.id = $1 AND p.company_id = $2 AND p.deleted_at IS NULL"
        ))
        .bind(id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(product)
    }

    /// Includes deleted products, for rendering historical documents.
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = sqlx::query_as::<_, ProductDBResponse>(&format!("{SELECT_PRODUCT} WHERE p.id = ANY($1) AND p.company_id = $2"))
            .bind(&ids)
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = self.filtered(SELECT_PRODUCT, filter);
        query.push(" ORDER BY p.name LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let products = query.build_query_as::<ProductDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(products)
    }

    /// Soft delete; sales and repairs keep referencing the row.
    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = now(), active = false WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(self.company_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let product = sqlx::query_as::<_, ProductDBResponse>(
            r#"
            WITH updated AS (
                UPDATE products SET
                    category_id = COALESCE($3, category_id),
                    name = COALESCE($4, name),
                    sku = COALESCE($5, sku),
                    description = COALESCE($6, description),
                    cost_price = COALESCE($7, cost_price),
                    sale_price = COALESCE($8, sale_price),
                    min_stock = COALESCE($9, min_stock),
                    active = COALESCE($10, active)
                WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
                RETURNING *
            )
            SELECT p.*, c.name AS category_name FROM updated p LEFT JOIN categories c ON c.id = p.category_id
            "#,
        )
        .bind(id)
        .bind(self.company_id)
        .bind(request.category_id)
        .bind(&request.name)
        .bind(&request.sku)
        .bind(&request.description)
        .bind(request.cost_price)
        .bind(request.sale_price)
        .bind(request.min_stock)
        .bind(request.active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(product)
    }
}
