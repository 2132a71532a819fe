//! Read-only aggregate queries for reports, the dashboard and CSV exports.

use crate::api::models::reports::{DailyTotal, MethodTotal, SalesTotals, StatusCount, TopProduct};
use crate::db::{errors::Result, models::reports::RepairExportRow, models::sales::SaleDBResponse};
use crate::inventory::LiquidationRow;
use crate::types::CompanyId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;

const TOP_PRODUCTS: i64 = 10;

pub struct Reports<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Reports<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    /// Active, non-deleted products with stock on hand.
    #[instrument(skip(self), err)]
    pub async fn liquidation_rows(&mut self) -> Result<Vec<LiquidationRow>> {
        let rows = sqlx::query_as::<_, LiquidationRow>(
            r#"
            SELECT p.id AS product_id, p.sku, p.name, c.name AS category, p.stock, p.cost_price, p.sale_price
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.company_id = $1 AND p.deleted_at IS NULL AND p.active AND p.stock > 0
            "#,
        )
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), err)]
    pub async fn sales_totals(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<SalesTotals> {
        let totals = sqlx::query_as::<_, SalesTotals>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'completed') AS sale_count,
                COALESCE(SUM(subtotal) FILTER (WHERE status = 'completed'), 0) AS subtotal,
                COALESCE(SUM(discount) FILTER (WHERE status = 'completed'), 0) AS discount,
                COALESCE(SUM(tax) FILTER (WHERE status = 'completed'), 0) AS tax,
                COALESCE(SUM(total) FILTER (WHERE status = 'completed'), 0) AS total,
                COALESCE(ROUND(AVG(total) FILTER (WHERE status = 'completed'), 2), 0) AS average_ticket,
                COUNT(*) FILTER (WHERE status = 'voided') AS voided_count
            FROM sales
            WHERE company_id = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(self.company_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(totals)
    }

    pub async fn sales_by_method(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<MethodTotal>> {
        let rows = sqlx::query_as::<_, MethodTotal>(
            r#"
            SELECT payment_method AS method, COUNT(*) AS count, SUM(total) AS total
            FROM sales
            WHERE company_id = $1 AND status = 'completed' AND created_at >= $2 AND created_at < $3
            GROUP BY payment_method
            ORDER BY total DESC
            "#,
        )
        .bind(self.company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Daily totals, bucketed by UTC calendar day.
    pub async fn sales_by_day(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<DailyTotal>> {
        let rows = sqlx::query_as::<_, DailyTotal>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS count, SUM(total) AS total
            FROM sales
            WHERE company_id = $1 AND status = 'completed' AND created_at >= $2 AND created_at < $3
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(self.company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    pub async fn top_products(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT i.product_id, p.name, SUM(i.quantity)::BIGINT AS units, SUM(i.line_total) AS revenue
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            JOIN products p ON p.id = i.product_id
            WHERE s.company_id = $1 AND s.status = 'completed' AND s.created_at >= $2 AND s.created_at < $3
            GROUP BY i.product_id, p.name
            ORDER BY revenue DESC, units DESC
            LIMIT $4
            "#,
        )
        .bind(self.company_id)
        .bind(from)
        .bind(to)
        .bind(TOP_PRODUCTS)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    pub async fn active_repairs_by_status(&mut self) -> Result<Vec<StatusCount>> {
        let rows = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM repair_orders
            WHERE company_id = $1 AND status NOT IN ('delivered', 'cancelled')
            GROUP BY status
            "#,
        )
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Sum of positive balances over orders that are not cancelled.
    pub async fn outstanding_balance(&mut self) -> Result<Decimal> {
        let balance: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(GREATEST(r.total_cost - COALESCE(p.paid, 0), 0)), 0)
            FROM repair_orders r
            LEFT JOIN (
                SELECT repair_order_id, SUM(amount) AS paid
                FROM repair_payments
                WHERE company_id = $1
                GROUP BY repair_order_id
            ) p ON p.repair_order_id = r.id
            WHERE r.company_id = $1 AND r.status <> 'cancelled'
            "#,
        )
        .bind(self.company_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(balance)
    }

    pub async fn low_stock_count(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE company_id = $1 AND deleted_at IS NULL AND active AND stock <= min_stock",
        )
        .bind(self.company_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    /// Every sale in the range, oldest first, for export.
    #[instrument(skip(self), err)]
    pub async fn sales_for_export(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<SaleDBResponse>> {
        let rows = sqlx::query_as::<_, SaleDBResponse>(
            r#"
            SELECT s.*, c.name AS customer_name
            FROM sales s LEFT JOIN customers c ON c.id = s.customer_id
            WHERE s.company_id = $1 AND s.created_at >= $2 AND s.created_at < $3
            ORDER BY s.created_at
            "#,
        )
        .bind(self.company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Every repair order received in the range, oldest first, with amounts paid.
    #[instrument(skip(self), err)]
    pub async fn repairs_for_export(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<RepairExportRow>> {
        let rows = sqlx::query_as::<_, RepairExportRow>(
            r#"
            SELECT r.order_number, r.received_at, c.name AS customer_name, r.device_type, r.brand, r.model,
                   r.serial_number, r.status, t.name AS technician_name, r.labor_cost, r.parts_cost, r.total_cost,
                   COALESCE((SELECT SUM(amount) FROM repair_payments p WHERE p.repair_order_id = r.id), 0) AS paid,
                   r.delivered_at
            FROM repair_orders r
            JOIN customers c ON c.id = r.customer_id
            LEFT JOIN technicians t ON t.id = r.technician_id
            WHERE r.company_id = $1 AND r.received_at >= $2 AND r.received_at < $3
            ORDER BY r.received_at
            "#,
        )
        .bind(self.company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }
}
