//! Database repository for quotes and quote items.

use crate::api::models::quotes::QuoteStatus;
use crate::db::{
    errors::Result,
    handlers::push_search,
    models::quotes::{QuoteCreateDBRequest, QuoteDBResponse, QuoteItemCreateDBRequest, QuoteItemDBResponse},
};
use crate::types::{CompanyId, QuoteId, SaleId, abbrev_uuid};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["q.quote_number", "c.name"];

fn joined(source: &str) -> String {
    format!("SELECT q.*, c.name AS customer_name FROM {source} q LEFT JOIN customers c ON c.id = q.customer_id")
}

/// Filter for listing quotes
#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub status: Option<QuoteStatus>,
}

impl QuoteFilter {
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

pub struct Quotes<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Quotes<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    fn filtered<'q>(&self, select: &str, filter: &'q QuoteFilter) -> QueryBuilder<'q, Postgres> {
        let mut query = QueryBuilder::new(select);
        query.push(" WHERE q.company_id = ");
        query.push_bind(self.company_id);
        if let Some(status) = filter.status {
            query.push(" AND q.status = ");
            query.push_bind(status);
        }
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query
    }

    #[instrument(skip(self, request, quote_number), fields(quote_number = %quote_number), err)]
    pub async fn create(&mut self, request: &QuoteCreateDBRequest, quote_number: &str) -> Result<QuoteDBResponse> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO quotes (company_id, quote_number, customer_id, valid_until, subtotal, discount, tax_rate, tax, total, notes, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
            )
            {}
            "#,
            joined("inserted")
        );
        let quote = sqlx::query_as::<_, QuoteDBResponse>(&sql)
            .bind(self.company_id)
            .bind(quote_number)
            .bind(request.customer_id)
            .bind(request.valid_until)
            .bind(request.totals.subtotal)
            .bind(request.totals.discount)
            .bind(request.tax_rate)
            .bind(request.totals.tax)
            .bind(request.totals.total)
            .bind(&request.notes)
            .bind(request.created_by)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(quote)
    }

    pub async fn add_items(&mut self, quote_id: QuoteId, items: &[QuoteItemCreateDBRequest]) -> Result<Vec<QuoteItemDBResponse>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO quote_items (company_id, quote_id, product_id, description, quantity, unit_price, line_total) ",
        );
        query.push_values(items, |mut row, item| {
            row.push_bind(self.company_id)
                .push_bind(quote_id)
                .push_bind(item.product_id)
                .push_bind(&item.description)
                .push_bind(item.quantity)
                .push_bind(item.unit_price)
                .push_bind(item.line_total);
        });
        query.push(" RETURNING *");

        let rows = query.build_query_as::<QuoteItemDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(quote_id = %abbrev_uuid(&id)), err)]
    pub async fn get(&mut self, id: QuoteId) -> Result<Option<QuoteDBResponse>> {
        let quote = sqlx::query_as::<_, QuoteDBResponse>(&format!("{} WHERE q.id = $1 AND q.company_id = $2", joined("quotes")))
            .bind(id)
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(quote)
    }

    pub async fn get_for_update(&mut self, id: QuoteId) -> Result<Option<QuoteDBResponse>> {
        let quote = sqlx::query_as::<_, QuoteDBResponse>(&format!(
            "{} WHERE q.id = $1 AND q.company_id = $2 FOR UPDATE OF q",
            joined("quotes")
        ))
        .bind(id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(quote)
    }

    pub async fn list_items(&mut self, quote_id: QuoteId) -> Result<Vec<QuoteItemDBResponse>> {
        let items = sqlx::query_as::<_, QuoteItemDBResponse>("SELECT * FROM quote_items WHERE quote_id = $1 AND company_id = $2 ORDER BY description")
            .bind(quote_id)
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(items)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &QuoteFilter) -> Result<Vec<QuoteDBResponse>> {
        let select = joined("quotes");
        let mut query = self.filtered(&select, filter);
        query.push(" ORDER BY q.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let quotes = query.build_query_as::<QuoteDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(quotes)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &QuoteFilter) -> Result<i64> {
        let mut query = self.filtered("SELECT COUNT(*) FROM quotes q LEFT JOIN customers c ON c.id = q.customer_id", filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Move from `from` to `to`. `None` if the quote is missing or no longer in `from`.
    #[instrument(skip(self), fields(quote_id = %abbrev_uuid(&id)), err)]
    pub async fn set_status(&mut self, id: QuoteId, from: QuoteStatus, to: QuoteStatus) -> Result<Option<QuoteDBResponse>> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE quotes SET status = $4
                WHERE id = $1 AND company_id = $2 AND status = $3
                RETURNING *
            )
            {}
            "#,
            joined("updated")
        );
        let quote = sqlx::query_as::<_, QuoteDBResponse>(&sql)
            .bind(id)
            .bind(self.company_id)
            .bind(from)
            .bind(to)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(quote)
    }

    pub async fn mark_converted(&mut self, id: QuoteId, sale_id: SaleId) -> Result<Option<QuoteDBResponse>> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE quotes SET status = 'converted', sale_id = $3
                WHERE id = $1 AND company_id = $2 AND status IN ('draft', 'sent', 'accepted')
                RETURNING *
            )
            {}
            "#,
            joined("updated")
        );
        let quote = sqlx::query_as::<_, QuoteDBResponse>(&sql)
            .bind(id)
            .bind(self.company_id)
            .bind(sale_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(quote)
    }
}
