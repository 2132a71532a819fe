//! Database repository for cash register openings and closures.
//!
//! A company has at most one open register, enforced by the partial unique index
//! `cash_register_one_open`. Closing computes the shift totals from sales and repair payments
//! recorded since the opening.

use crate::cash::{CashTotals, Reconciliation};
use crate::db::{
    errors::{DbError, Result},
    models::cash_register::{CashClosureDBResponse, CashEntryRow, CashOpeningDBResponse},
};
use crate::types::{CashOpeningId, CompanyId, ProfileId, abbrev_uuid};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{info, instrument};

const SELECT_OPENING: &str =
    "SELECT o.*, p.full_name AS opened_by_name FROM cash_register_openings o LEFT JOIN profiles p ON p.id = o.opened_by";

const SELECT_CLOSURE: &str = r#"
    SELECT cl.*, p.full_name AS closed_by_name, o.opened_at
    FROM cash_register_closures cl
    JOIN cash_register_openings o ON o.id = cl.opening_id
    LEFT JOIN profiles p ON p.id = cl.closed_by
"#;

pub struct CashRegister<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> CashRegister<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    /// Open a shift. Fails with a unique violation on `cash_register_one_open` if one is open.
    #[instrument(skip(self, notes), fields(company_id = %abbrev_uuid(&self.company_id), opening_amount = %opening_amount), err)]
    pub async fn open(&mut self, opened_by: ProfileId, opening_amount: Decimal, notes: Option<&str>) -> Result<CashOpeningDBResponse> {
        let opening = sqlx::query_as::<_, CashOpeningDBResponse>(
            r#"
            WITH inserted AS (
                INSERT INTO cash_register_openings (company_id, opened_by, opening_amount, notes)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT o.*, p.full_name AS opened_by_name FROM inserted o LEFT JOIN profiles p ON p.id = o.opened_by
            "#,
        )
        .bind(self.company_id)
        .bind(opened_by)
        .bind(opening_amount)
        .bind(notes)
        .fetch_one(&mut *self.db)
        .await?;

        info!("Cash register opened");
        Ok(opening)
    }

    pub async fn current(&mut self) -> Result<Option<CashOpeningDBResponse>> {
        let opening = sqlx::query_as::<_, CashOpeningDBResponse>(&format!("{SELECT_OPENING} WHERE o.company_id = $1 AND NOT o.closed"))
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(opening)
    }

    /// The open shift, locked against a concurrent close.
    pub async fn current_for_update(&mut self) -> Result<Option<CashOpeningDBResponse>> {
        let opening = sqlx::query_as::<_, CashOpeningDBResponse>(&format!(
            "{SELECT_OPENING} WHERE o.company_id = $1 AND NOT o.closed FOR UPDATE OF o"
        ))
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(opening)
    }

    /// Completed sales and repair payments taken at or after `since`, summed by method.
    #[instrument(skip(self), err)]
    pub async fn totals_since(&mut self, since: DateTime<Utc>) -> Result<CashTotals> {
        let rows = sqlx::query_as::<_, CashEntryRow>(
            r#"
            SELECT 'sale' AS source, payment_method AS method, SUM(total) AS amount
            FROM sales
            WHERE company_id = $1 AND status = 'completed' AND created_at >= $2
            GROUP BY payment_method
            UNION ALL
            SELECT 'repair_payment' AS source, method, SUM(amount) AS amount
            FROM repair_payments
            WHERE company_id = $1 AND created_at >= $2
            GROUP BY method
            "#,
        )
        .bind(self.company_id)
        .bind(since)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(CashTotals::from_entries(rows.into_iter().map(CashEntryRow::into_entry)))
    }

    /// Record the closure and mark the opening closed.
    #[instrument(skip(self, reconciliation, notes), fields(opening_id = %abbrev_uuid(&opening_id), difference = %reconciliation.difference), err)]
    pub async fn close(
        &mut self,
        opening_id: CashOpeningId,
        closed_by: ProfileId,
        reconciliation: &Reconciliation,
        notes: Option<&str>,
    ) -> Result<CashClosureDBResponse> {
        let updated = sqlx::query("UPDATE cash_register_openings SET closed = true WHERE id = $1 AND company_id = $2 AND NOT closed")
            .bind(opening_id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        let totals = &reconciliation.totals;
        let closure = sqlx::query_as::<_, CashClosureDBResponse>(
            r#"
            WITH inserted AS (
                INSERT INTO cash_register_closures (
                    company_id, opening_id, closed_by, opening_amount, cash_sales, cash_repair_payments,
                    card_total, transfer_total, other_total, expected_cash, counted_cash, difference, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING *
            )
            SELECT cl.*, p.full_name AS closed_by_name, o.opened_at
            FROM inserted cl
            JOIN cash_register_openings o ON o.id = cl.opening_id
            LEFT JOIN profiles p ON p.id = cl.closed_by
            "#,
        )
        .bind(self.company_id)
        .bind(opening_id)
        .bind(closed_by)
        .bind(reconciliation.opening_amount)
        .bind(totals.cash_sales)
        .bind(totals.cash_repair_payments)
        .bind(totals.card_total)
        .bind(totals.transfer_total)
        .bind(totals.other_total)
        .bind(reconciliation.expected_cash)
        .bind(reconciliation.counted_cash)
        .bind(reconciliation.difference)
        .bind(notes)
        .fetch_one(&mut *self.db)
        .await?;

        info!(status = ?reconciliation.status, "Cash register closed");
        Ok(closure)
    }

    pub async fn list_closures(&mut self, skip: i64, limit: i64) -> Result<Vec<CashClosureDBResponse>> {
        let closures = sqlx::query_as::<_, CashClosureDBResponse>(&format!(
            "{SELECT_CLOSURE} WHERE cl.company_id = $1 ORDER BY cl.closed_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(self.company_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(closures)
    }

    pub async fn count_closures(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cash_register_closures WHERE company_id = $1")
            .bind(self.company_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}
