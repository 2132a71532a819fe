//! Database repository for sales and sale items.

use crate::api::models::sales::SaleStatus;
use crate::db::{
    errors::Result,
    handlers::push_search,
    models::sales::{SaleCreateDBRequest, SaleDBResponse, SaleItemCreateDBRequest, SaleItemDBResponse},
};
use crate::types::{CompanyId, SaleId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["s.sale_number", "c.name"];

fn joined(source: &str) -> String {
    format!("SELECT s.*, c.name AS customer_name FROM {source} s LEFT JOIN customers c ON c.id = s.customer_id")
}

/// Filter for listing sales
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub status: Option<SaleStatus>,
    /// Half-open `[from, to)` window on `created_at`
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl SaleFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }
}

pub struct Sales<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Sales<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    fn filtered<'q>(&self, select: &str, filter: &'q SaleFilter) -> QueryBuilder<'q, Postgres> {
        let mut query = QueryBuilder::new(select);
        query.push(" WHERE s.company_id = ");
        query.push_bind(self.company_id);
        if let Some(status) = filter.status {
            query.push(" AND s.status = ");
            query.push_bind(status);
        }
        if let Some((from, to)) = filter.created_between {
            query.push(" AND s.created_at >= ");
            query.push_bind(from);
            query.push(" AND s.created_at < ");
            query.push_bind(to);
        }
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query
    }

    /// Insert the sale header. Items and stock deductions follow in the same transaction.
    #[instrument(skip(self, request, sale_number), fields(sale_number = %sale_number, total = %request.totals.total), err)]
    pub async fn create(&mut self, request: &SaleCreateDBRequest, sale_number: &str) -> Result<SaleDBResponse> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO sales (company_id, sale_number, customer_id, payment_method, subtotal, discount, tax, total, notes, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            )
            {}
            "#,
            joined("inserted")
        );
        let sale = sqlx::query_as::<_, SaleDBResponse>(&sql)
            .bind(self.company_id)
            .bind(sale_number)
            .bind(request.customer_id)
            .bind(request.payment_method)
            .bind(request.totals.subtotal)
            .bind(request.totals.discount)
            .bind(request.totals.tax)
            .bind(request.totals.total)
            .bind(&request.notes)
            .bind(request.created_by)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(sale)
    }

    #[instrument(skip(self, items), fields(sale_id = %abbrev_uuid(&sale_id), count = items.len()), err)]
    pub async fn add_items(&mut self, sale_id: SaleId, items: &[SaleItemCreateDBRequest]) -> Result<Vec<SaleItemDBResponse>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO sale_items (company_id, sale_id, product_id, description, quantity, unit_price, line_total) ",
        );
        query.push_values(items, |mut row, item| {
            row.push_bind(self.company_id)
                .push_bind(sale_id)
                .push_bind(item.product_id)
                .push_bind(&item.description)
                .push_bind(item.quantity)
                .push_bind(item.unit_price)
                .push_bind(item.line_total);
        });
        query.push(" RETURNING *");

        let rows = query.build_query_as::<SaleItemDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(sale_id = %abbrev_uuid(&id)), err)]
    pub async fn get(&mut self, id: SaleId) -> Result<Option<SaleDBResponse>> {
        let sale = sqlx::query_as::<_, SaleDBResponse>(&format!("{} WHERE s.id = $1 AND s.company_id = $2", joined("sales")))
            .bind(id)
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(sale)
    }

    pub async fn list_items(&mut self, sale_id: SaleId) -> Result<Vec<SaleItemDBResponse>> {
        let items = sqlx::query_as::<_, SaleItemDBResponse>("SELECT * FROM sale_items WHERE sale_id = $1 AND company_id = $2 ORDER BY description")
            .bind(sale_id)
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(items)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &SaleFilter) -> Result<Vec<SaleDBResponse>> {
        let select = joined("sales");
        let mut query = self.filtered(&select, filter);
        query.push(" ORDER BY s.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let sales = query.build_query_as::<SaleDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(sales)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &SaleFilter) -> Result<i64> {
        let mut query = self.filtered("SELECT COUNT(*) FROM sales s LEFT JOIN customers c ON c.id = s.customer_id", filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Flip a completed sale to voided. `None` if it is missing or already voided.
    #[instrument(skip(self, reason), fields(sale_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_voided(&mut self, id: SaleId, reason: Option<&str>) -> Result<Option<SaleDBResponse>> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE sales SET
                    status = 'voided',
                    voided_at = now(),
                    notes = CASE WHEN $3::TEXT IS NULL THEN notes
                                 ELSE concat_ws(E'\n', notes, 'Voided: ' || $3) END
                WHERE id = $1 AND company_id = $2 AND status = 'completed'
                RETURNING *
            )
            {}
            "#,
            joined("updated")
        );
        let sale = sqlx::query_as::<_, SaleDBResponse>(&sql)
            .bind(id)
            .bind(self.company_id)
            .bind(reason)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(sale)
    }
}
