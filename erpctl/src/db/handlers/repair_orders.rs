//! Database repository for repair orders, their items, payments and notes.
//!
//! Workflow rules live in [`crate::repairs`]; this repository only persists their outcome. Status
//! changes are applied with the expected current status in the `WHERE` clause, so a concurrent
//! change makes the update miss instead of silently overwriting.

use crate::db::{
    errors::{DbError, Result},
    handlers::push_search,
    models::repairs::{
        RepairItemCreateDBRequest, RepairItemDBResponse, RepairNoteDBResponse, RepairOrderCreateDBRequest, RepairOrderDBResponse,
        RepairOrderUpdateDBRequest, RepairPaymentCreateDBRequest, RepairPaymentDBResponse,
    },
};
use crate::repairs::{CostBreakdown, RepairStatus, TransitionPlan};
use crate::types::{CompanyId, CustomerId, ProfileId, RepairItemId, RepairOrderId, TechnicianId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::{info, instrument};
use uuid::Uuid;

const SEARCH_COLUMNS: &[&str] = &["r.order_number", "r.device_type", "r.brand", "r.model", "r.serial_number", "c.name"];

/// `SELECT` of repair orders from `source` (a table or CTE) joined with display names.
fn joined(source: &str) -> String {
    format!(
        "SELECT r.*, c.name AS customer_name, c.email AS customer_email, t.name AS technician_name \
         FROM {source} r \
         JOIN customers c ON c.id = r.customer_id \
         LEFT JOIN technicians t ON t.id = r.technician_id"
    )
}

/// Filter for listing repair orders
#[derive(Debug, Clone, Default)]
pub struct RepairOrderFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub status: Option<RepairStatus>,
    pub active_only: bool,
    pub customer_id: Option<CustomerId>,
    pub technician_id: Option<TechnicianId>,
    /// Half-open `[from, to)` window on `received_at`
    pub received_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl RepairOrderFilter {
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

pub struct RepairOrders<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> RepairOrders<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    fn filtered<'q>(&self, select: &str, filter: &'q RepairOrderFilter) -> QueryBuilder<'q, Postgres> {
        let mut query = QueryBuilder::new(select);
        query.push(" WHERE r.company_id = ");
        query.push_bind(self.company_id);
        if let Some(status) = filter.status {
            query.push(" AND r.status = ");
            query.push_bind(status);
        }
        if filter.active_only {
            query.push(" AND r.status NOT IN ('delivered', 'cancelled')");
        }
        if let Some(customer_id) = filter.customer_id {
            query.push(" AND r.customer_id = ");
            query.push_bind(customer_id);
        }
        if let Some(technician_id) = filter.technician_id {
            query.push(" AND r.technician_id = ");
            query.push_bind(technician_id);
        }
        if let Some((from, to)) = filter.received_between {
            query.push(" AND r.received_at >= ");
            query.push_bind(from);
            query.push(" AND r.received_at < ");
            query.push_bind(to);
        }
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query
    }

    #[instrument(skip(self, request, order_number), fields(order_number = %order_number), err)]
    pub async fn create(&mut self, request: &RepairOrderCreateDBRequest, order_number: &str) -> Result<RepairOrderDBResponse> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO repair_orders (
                    company_id, order_number, customer_id, technician_id, device_type, brand, model,
                    serial_number, reported_issue, diagnosis, labor_cost, total_cost, estimated_delivery, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $12, $13)
                RETURNING *
            )
            {}
            "#,
            joined("inserted")
        );
        let order = sqlx::query_as::<_, RepairOrderDBResponse>(&sql)
            .bind(self.company_id)
            .bind(order_number)
            .bind(request.customer_id)
            .bind(request.technician_id)
            .bind(&request.device_type)
            .bind(&request.brand)
            .bind(&request.model)
            .bind(&request.serial_number)
            .bind(&request.reported_issue)
            .bind(&request.diagnosis)
            .bind(request.labor_cost)
            .bind(request.estimated_delivery)
            .bind(request.created_by)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    pub async fn get(&mut self, id: RepairOrderId) -> Result<Option<RepairOrderDBResponse>> {
        let order = sqlx::query_as::<_, RepairOrderDBResponse>(&format!("{} WHERE r.id = $1 AND r.company_id = $2", joined("repair_orders")))
            .bind(id)
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(order)
    }

    /// Like [`get`](Self::get), holding a row lock until the transaction ends.
    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    pub async fn get_for_update(&mut self, id: RepairOrderId) -> Result<Option<RepairOrderDBResponse>> {
        let order = sqlx::query_as::<_, RepairOrderDBResponse>(&format!(
            "{} WHERE r.id = $1 AND r.company_id = $2 FOR UPDATE OF r",
            joined("repair_orders")
        ))
        .bind(id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(order)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &RepairOrderFilter) -> Result<Vec<RepairOrderDBResponse>> {
        let select = joined("repair_orders");
        let mut query = self.filtered(&select, filter);
        query.push(" ORDER BY r.received_at DESC, r.order_number DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let orders = query.build_query_as::<RepairOrderDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(orders)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &RepairOrderFilter) -> Result<i64> {
        let mut query = self.filtered("SELECT COUNT(*) FROM repair_orders r JOIN customers c ON c.id = r.customer_id", filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Update intake details. Costs are recomputed separately with [`set_costs`](Self::set_costs).
    #[instrument(skip(self, request), fields(order_id = %abbrev_uuid(&id)), err)]
    pub async fn update(&mut self, id: RepairOrderId, request: &RepairOrderUpdateDBRequest) -> Result<RepairOrderDBResponse> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE repair_orders SET
                    technician_id = COALESCE($3, technician_id),
                    device_type = COALESCE($4, device_type),
                    brand = COALESCE($5, brand),
                    model = COALESCE($6, model),
                    serial_number = COALESCE($7, serial_number),
                    reported_issue = COALESCE($8, reported_issue),
                    diagnosis = COALESCE($9, diagnosis),
                    labor_cost = COALESCE($10, labor_cost),
                    estimated_delivery = COALESCE($11, estimated_delivery)
                WHERE id = $1 AND company_id = $2
                RETURNING *
            )
            {}
            "#,
            joined("updated")
        );
        let order = sqlx::query_as::<_, RepairOrderDBResponse>(&sql)
            .bind(id)
            .bind(self.company_id)
            .bind(request.technician_id)
            .bind(&request.device_type)
            .bind(&request.brand)
            .bind(&request.model)
            .bind(&request.serial_number)
            .bind(&request.reported_issue)
            .bind(&request.diagnosis)
            .bind(request.labor_cost)
            .bind(request.estimated_delivery)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(order)
    }

    /// Write a planned status change. Returns `None` if the order is no longer in `plan.from`.
    #[instrument(skip(self, plan), fields(order_id = %abbrev_uuid(&id), from = %plan.from, to = %plan.to), err)]
    pub async fn apply_transition(&mut self, id: RepairOrderId, plan: &TransitionPlan) -> Result<Option<RepairOrderDBResponse>> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE repair_orders SET
                    status = $4,
                    completed_at = CASE WHEN $5 THEN COALESCE(completed_at, now()) ELSE completed_at END,
                    delivered_at = CASE WHEN $6 THEN now() ELSE delivered_at END,
                    cancelled_at = CASE WHEN $7 THEN now() ELSE cancelled_at END
                WHERE id = $1 AND company_id = $2 AND status = $3
                RETURNING *
            )
            {}
            "#,
            joined("updated")
        );
        let order = sqlx::query_as::<_, RepairOrderDBResponse>(&sql)
            .bind(id)
            .bind(self.company_id)
            .bind(plan.from)
            .bind(plan.to)
            .bind(plan.stamp_completed)
            .bind(plan.stamp_delivered)
            .bind(plan.stamp_cancelled)
            .fetch_optional(&mut *self.db)
            .await?;

        if order.is_some() {
            metrics::counter!("erpctl_repair_status_changes_total", "to" => plan.to.as_str()).increment(1);
            info!("Repair order status changed");
        }
        Ok(order)
    }

    pub async fn set_costs(&mut self, id: RepairOrderId, costs: &CostBreakdown) -> Result<()> {
        let result = sqlx::query("UPDATE repair_orders SET parts_cost = $3, total_cost = $4 WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(self.company_id)
            .bind(costs.parts)
            .bind(costs.total)
            .execute(&mut *self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // Items

    #[instrument(skip(self, request), fields(order_id = %abbrev_uuid(&order_id)), err)]
    pub async fn add_item(&mut self, order_id: RepairOrderId, request: &RepairItemCreateDBRequest) -> Result<RepairItemDBResponse> {
        let item = sqlx::query_as::<_, RepairItemDBResponse>(
            r#"
            INSERT INTO repair_items (company_id, repair_order_id, product_id, description, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(self.company_id)
        .bind(order_id)
        .bind(request.product_id)
        .bind(&request.description)
        .bind(request.quantity)
        .bind(request.unit_price)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(item)
    }

    pub async fn list_items(&mut self, order_id: RepairOrderId) -> Result<Vec<RepairItemDBResponse>> {
        let items = sqlx::query_as::<_, RepairItemDBResponse>(
            "SELECT * FROM repair_items WHERE repair_order_id = $1 AND company_id = $2 ORDER BY created_at, id",
        )
        .bind(order_id)
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(items)
    }

    pub async fn get_item(&mut self, order_id: RepairOrderId, item_id: RepairItemId) -> Result<Option<RepairItemDBResponse>> {
        let item = sqlx::query_as::<_, RepairItemDBResponse>(
            "SELECT * FROM repair_items WHERE id = $1 AND repair_order_id = $2 AND company_id = $3",
        )
        .bind(item_id)
        .bind(order_id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(item)
    }

    /// Remove an item whose stock has not been deducted. Returns false if it is missing or used.
    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&item_id)), err)]
    pub async fn delete_unused_item(&mut self, order_id: RepairOrderId, item_id: RepairItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM repair_items WHERE id = $1 AND repair_order_id = $2 AND company_id = $3 AND NOT used")
            .bind(item_id)
            .bind(order_id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flag an unused product item as used. `None` if it was already used (or is not a product line).
    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&item_id)), err)]
    pub async fn mark_item_used(&mut self, order_id: RepairOrderId, item_id: RepairItemId) -> Result<Option<RepairItemDBResponse>> {
        let item = sqlx::query_as::<_, RepairItemDBResponse>(
            r#"
            UPDATE repair_items SET used = true, used_at = now()
            WHERE id = $1 AND repair_order_id = $2 AND company_id = $3 AND NOT used AND product_id IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(order_id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(item)
    }

    /// Flip every used product item of the order back to unused, returning the flipped rows.
    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&order_id)), err)]
    pub async fn release_used_items(&mut self, order_id: RepairOrderId) -> Result<Vec<RepairItemDBResponse>> {
        let items = sqlx::query_as::<_, RepairItemDBResponse>(
            r#"
            UPDATE repair_items SET used = false, used_at = NULL
            WHERE repair_order_id = $1 AND company_id = $2 AND used AND product_id IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(items)
    }

    // Payments

    #[instrument(skip(self, request), fields(order_id = %abbrev_uuid(&order_id), amount = %request.amount), err)]
    pub async fn add_payment(&mut self, order_id: RepairOrderId, request: &RepairPaymentCreateDBRequest) -> Result<RepairPaymentDBResponse> {
        let payment = sqlx::query_as::<_, RepairPaymentDBResponse>(
            r#"
            INSERT INTO repair_payments (company_id, repair_order_id, amount, method, reference, received_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(self.company_id)
        .bind(order_id)
        .bind(request.amount)
        .bind(request.method)
        .bind(&request.reference)
        .bind(request.received_by)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(payment)
    }

    pub async fn list_payments(&mut self, order_id: RepairOrderId) -> Result<Vec<RepairPaymentDBResponse>> {
        let payments = sqlx::query_as::<_, RepairPaymentDBResponse>(
            "SELECT * FROM repair_payments WHERE repair_order_id = $1 AND company_id = $2 ORDER BY created_at",
        )
        .bind(order_id)
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(payments)
    }

    // Notes

    pub async fn add_note(&mut self, order_id: RepairOrderId, author_id: ProfileId, body: &str, is_internal: bool) -> Result<RepairNoteDBResponse> {
        let note = sqlx::query_as::<_, RepairNoteDBResponse>(
            r#"
            WITH inserted AS (
                INSERT INTO repair_notes (company_id, repair_order_id, author_id, body, is_internal)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT n.*, p.full_name AS author_name FROM inserted n LEFT JOIN profiles p ON p.id = n.author_id
            "#,
        )
        .bind(self.company_id)
        .bind(order_id)
        .bind(author_id)
        .bind(body)
        .bind(is_internal)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(note)
    }

    pub async fn list_notes(&mut self, order_id: RepairOrderId) -> Result<Vec<RepairNoteDBResponse>> {
        let notes = sqlx::query_as::<_, RepairNoteDBResponse>(
            r#"
            SELECT n.*, p.full_name AS author_name
            FROM repair_notes n LEFT JOIN profiles p ON p.id = n.author_id
            WHERE n.repair_order_id = $1 AND n.company_id = $2
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(order_id)
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(notes)
    }

    pub async fn delete_note(&mut self, order_id: RepairOrderId, note_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM repair_notes WHERE id = $1 AND repair_order_id = $2 AND company_id = $3")
            .bind(note_id)
            .bind(order_id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
