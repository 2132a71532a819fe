//! Database repository for purchase orders and their items.

use crate::api::models::purchase_orders::PurchaseOrderStatus;
use crate::db::{
    errors::Result,
    handlers::push_search,
    models::purchase_orders::{
        PurchaseOrderCreateDBRequest, PurchaseOrderDBResponse, PurchaseOrderItemCreateDBRequest, PurchaseOrderItemDBResponse,
    },
};
use crate::types::{CompanyId, PurchaseOrderId, SupplierId, abbrev_uuid};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["o.order_number", "s.name"];

fn joined(source: &str) -> String {
    format!("SELECT o.*, s.name AS supplier_name FROM {source} o JOIN suppliers s ON s.id = o.supplier_id")
}

/// Filter for listing purchase orders
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<SupplierId>,
}

impl PurchaseOrderFilter {
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

pub struct PurchaseOrders<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> PurchaseOrders<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    fn filtered<'q>(&self, select: &str, filter: &'q PurchaseOrderFilter) -> QueryBuilder<'q, Postgres> {
        let mut query = QueryBuilder::new(select);
        query.push(" WHERE o.company_id = ");
        query.push_bind(self.company_id);
        if let Some(status) = filter.status {
            query.push(" AND o.status = ");
            query.push_bind(status);
        }
        if let Some(supplier_id) = filter.supplier_id {
            query.push(" AND o.supplier_id = ");
            query.push_bind(supplier_id);
        }
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query
    }

    #[instrument(skip(self, request, order_number), fields(order_number = %order_number), err)]
    pub async fn create(&mut self, request: &PurchaseOrderCreateDBRequest, order_number: &str) -> Result<PurchaseOrderDBResponse> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO purchase_orders (company_id, order_number, supplier_id, expected_date, subtotal, tax, total, notes, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
            )
            {}
            "#,
            joined("inserted")
        );
        let order = sqlx::query_as::<_, PurchaseOrderDBResponse>(&sql)
            .bind(self.company_id)
            .bind(order_number)
            .bind(request.supplier_id)
            .bind(request.expected_date)
            .bind(request.totals.subtotal)
            .bind(request.totals.tax)
            .bind(request.totals.total)
            .bind(&request.notes)
            .bind(request.created_by)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(order)
    }

    pub async fn add_items(
        &mut self,
        order_id: PurchaseOrderId,
        items: &[PurchaseOrderItemCreateDBRequest],
    ) -> Result<Vec<PurchaseOrderItemDBResponse>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = QueryBuilder::<Postgres>::new(
            "WITH inserted AS (INSERT INTO purchase_order_items (company_id, purchase_order_id, product_id, quantity, unit_cost, line_total) ",
        );
        query.push_values(items, |mut row, item| {
            row.push_bind(self.company_id)
                .push_bind(order_id)
                .push_bind(item.product_id)
                .push_bind(item.quantity)
                .push_bind(item.unit_cost)
                .push_bind(item.line_total);
        });
        query.push(" RETURNING *) SELECT i.*, p.name AS product_name FROM inserted i JOIN products p ON p.id = i.product_id");

        let rows = query.build_query_as::<PurchaseOrderItemDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    pub async fn get(&mut self, id: PurchaseOrderId) -> Result<Option<PurchaseOrderDBResponse>> {
        let order = sqlx::query_as::<_, PurchaseOrderDBResponse>(&format!(
            "{} WHERE o.id = $1 AND o.company_id = $2",
            joined("purchase_orders")
        ))
        .bind(id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(order)
    }

    pub async fn get_for_update(&mut self, id: PurchaseOrderId) -> Result<Option<PurchaseOrderDBResponse>> {
        let order = sqlx::query_as::<_, PurchaseOrderDBResponse>(&format!(
            "{} WHERE o.id = $1 AND o.company_id = $2 FOR UPDATE OF o",
            joined("purchase_orders")
        ))
        .bind(id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(order)
    }

    pub async fn list_items(&mut self, order_id: PurchaseOrderId) -> Result<Vec<PurchaseOrderItemDBResponse>> {
        let items = sqlx::query_as::<_, PurchaseOrderItemDBResponse>(
            r#"
            SELECT i.*, p.name AS product_name
            FROM purchase_order_items i JOIN products p ON p.id = i.product_id
            WHERE i.purchase_order_id = $1 AND i.company_id = $2
            ORDER BY p.name
            "#,
        )
        .bind(order_id)
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(items)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &PurchaseOrderFilter) -> Result<Vec<PurchaseOrderDBResponse>> {
        let select = joined("purchase_orders");
        let mut query = self.filtered(&select, filter);
        query.push(" ORDER BY o.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let orders = query.build_query_as::<PurchaseOrderDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(orders)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &PurchaseOrderFilter) -> Result<i64> {
        let mut query = self.filtered("SELECT COUNT(*) FROM purchase_orders o JOIN suppliers s ON s.id = o.supplier_id", filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Move to `to` from any of its allowed source statuses, stamping the matching timestamp.
    /// `None` if the order is missing or not in an allowed status.
    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id), to = %to), err)]
    pub async fn transition(&mut self, id: PurchaseOrderId, to: PurchaseOrderStatus) -> Result<Option<PurchaseOrderDBResponse>> {
        let sources: Vec<&str> = PurchaseOrderStatus::allowed_sources(to).iter().map(|s| s.as_str()).collect();
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE purchase_orders SET
                    status = $3,
                    ordered_at = CASE WHEN $3 = 'ordered' THEN now() ELSE ordered_at END,
                    received_at = CASE WHEN $3 = 'received' THEN now() ELSE received_at END,
                    cancelled_at = CASE WHEN $3 = 'cancelled' THEN now() ELSE cancelled_at END
                WHERE id = $1 AND company_id = $2 AND status = ANY($4)
                RETURNING *
            )
            {}
            "#,
            joined("updated")
        );
        let order = sqlx::query_as::<_, PurchaseOrderDBResponse>(&sql)
            .bind(id)
            .bind(self.company_id)
            .bind(to.as_str())
            .bind(&sources)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(order)
    }
}
