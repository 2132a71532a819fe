//! Human-readable document numbers (`OR-000042`, `V-000913`, ...), unique per company.
//!
//! Numbers are allocated optimistically: read the highest number already issued for the company,
//! add one, and insert. Two concurrent requests can compute the same candidate; the loser's insert
//! hits the kind's unique constraint and is retried after a randomized exponential backoff, with a
//! fresh scan each time so no number is skipped. Each attempt runs inside a savepoint because a
//! unique violation aborts the surrounding PostgreSQL transaction.

use std::time::Duration;

use futures::future::BoxFuture;
use rand::prelude::RngExt;
use sqlx::{Connection, PgConnection};
use tracing::{debug, instrument, warn};

use crate::config::SequencesConfig;
use crate::db::errors::{DbError, Result as DbResult};
use crate::errors::{Error, Result};
use crate::types::CompanyId;

/// How many of the latest numbers to inspect when computing the next one.
const SCAN_WINDOW: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    RepairOrder,
    Sale,
    Quote,
    PurchaseOrder,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::RepairOrder => "repair_order",
            DocumentKind::Sale => "sale",
            DocumentKind::Quote => "quote",
            DocumentKind::PurchaseOrder => "purchase_order",
        }
    }

    fn table(&self) -> &'static str {
        match self {
            DocumentKind::RepairOrder => "repair_orders",
            DocumentKind::Sale => "sales",
            DocumentKind::Quote => "quotes",
            DocumentKind::PurchaseOrder => "purchase_orders",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            DocumentKind::RepairOrder => "order_number",
            DocumentKind::Sale => "sale_number",
            DocumentKind::Quote => "quote_number",
            DocumentKind::PurchaseOrder => "order_number",
        }
    }

    /// Unique constraint guarding `(company_id, number)` for this kind.
    pub fn constraint(&self) -> &'static str {
        match self {
            DocumentKind::RepairOrder => "repair_orders_number_unique",
            DocumentKind::Sale => "sales_number_unique",
            DocumentKind::Quote => "quotes_number_unique",
            DocumentKind::PurchaseOrder => "purchase_orders_number_unique",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SequenceSettings {
    pub repair_order_prefix: String,
    pub sale_prefix: String,
    pub quote_prefix: String,
    pub purchase_order_prefix: String,
    pub width: usize,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl SequenceSettings {
    pub fn prefix(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::RepairOrder => &self.repair_order_prefix,
            DocumentKind::Sale => &self.sale_prefix,
            DocumentKind::Quote => &self.quote_prefix,
            DocumentKind::PurchaseOrder => &self.purchase_order_prefix,
        }
    }
}

impl From<&SequencesConfig> for SequenceSettings {
    fn from(config: &SequencesConfig) -> Self {
        Self {
            repair_order_prefix: config.prefixes.repair_order.clone(),
            sale_prefix: config.prefixes.sale.clone(),
            quote_prefix: config.prefixes.quote.clone(),
            purchase_order_prefix: config.prefixes.purchase_order.clone(),
            width: config.width,
            max_attempts: config.max_attempts,
            base_backoff: config.base_backoff,
        }
    }
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self::from(&SequencesConfig::default())
    }
}

pub fn format_number(prefix: &str, value: u64, width: usize) -> String {
    format!("{prefix}{value:0width$}")
}

/// Numeric part of `number`, if it carries `prefix` followed only by digits.
pub fn parse_number(prefix: &str, number: &str) -> Option<u64> {
    let digits = number.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// One past the highest well-formed number, or 1 when there is none.
pub fn next_value<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> u64 {
    existing
        .into_iter()
        .filter_map(|n| parse_number(prefix, n))
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)` plus up to the same again in jitter.
pub fn backoff(attempt: u32, base: Duration) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt.saturating_sub(1).min(10));
    let exp_ms = u64::try_from(exp.as_millis()).unwrap_or(u64::MAX);
    let jitter = if exp_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=exp_ms)
    };
    exp + Duration::from_millis(jitter)
}

/// Latest well-formed numbers for the company, longest (i.e. highest once zero-padding
/// overflows) first. Numbers with anything but digits after the prefix never fill the window.
async fn scan_latest(conn: &mut PgConnection, kind: DocumentKind, company_id: CompanyId, prefix: &str) -> DbResult<Vec<String>> {
    let sql = format!(
        "SELECT {column} FROM {table} WHERE company_id = $1 AND starts_with({column}, $2) \
         AND substr({column}, length($2) + 1) ~ '^[0-9]+$' \
         ORDER BY length({column}) DESC, {column} DESC LIMIT $3",
        column = kind.column(),
        table = kind.table(),
    );
    let numbers: Vec<(String,)> = sqlx::query_as(&sql)
        .bind(company_id)
        .bind(prefix)
        .bind(SCAN_WINDOW)
        .fetch_all(&mut *conn)
        .await?;
    Ok(numbers.into_iter().map(|(n,)| n).collect())
}

/// Allocate the next number for `kind` and run `insert` with it.
///
/// `insert` is called once per attempt on a savepoint connection. A unique violation on the
/// kind's own constraint triggers a retry; any other error is returned as is. After
/// `max_attempts` collisions the request fails with [`Error::Conflict`].
#[instrument(skip(conn, settings, insert), fields(kind = kind.as_str(), company_id = %company_id), err)]
pub async fn insert_numbered<T, F>(
    conn: &mut PgConnection,
    kind: DocumentKind,
    company_id: CompanyId,
    settings: &SequenceSettings,
    mut insert: F,
) -> Result<T>
where
    F: for<'c> FnMut(&'c mut PgConnection, String) -> BoxFuture<'c, DbResult<T>>,
{
    let prefix = settings.prefix(kind);

    for attempt in 1..=settings.max_attempts {
        let latest = scan_latest(conn, kind, company_id, prefix).await?;
        let number = format_number(prefix, next_value(prefix, latest.iter().map(String::as_str)), settings.width);

        let mut savepoint = conn.begin().await.map_err(DbError::from)?;
        match insert(&mut *savepoint, number.clone()).await {
            Ok(value) => {
                savepoint.commit().await.map_err(DbError::from)?;
                debug!(number = %number, attempt, "Allocated document number");
                return Ok(value);
            }
            Err(err) if err.is_unique_violation_on(kind.constraint()) => {
                savepoint.rollback().await.map_err(DbError::from)?;
                metrics::counter!("erpctl_sequence_retries_total", "kind" => kind.as_str()).increment(1);
                if attempt < settings.max_attempts {
                    let delay = backoff(attempt, settings.base_backoff);
                    warn!(number = %number, attempt, ?delay, "Document number already taken, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(Error::Conflict {
        message: format!(
            "Could not allocate a {} number after {} attempts, please retry",
            kind.as_str().replace('_', " "),
            settings.max_attempts
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(format_number("OR-", 42, 6), "OR-000042");
        assert_eq!(format_number("V-", 1_234_567, 6), "V-1234567");
    }

    #[test]
    fn parse_rejects_foreign_prefixes_and_garbage() {
        assert_eq!(parse_number("OR-", "OR-000042"), Some(42));
        assert_eq!(parse_number("OR-", "OC-000042"), None);
        assert_eq!(parse_number("OR-", "OR-"), None);
        assert_eq!(parse_number("OR-", "OR-12a"), None);
        assert_eq!(parse_number("OR-", "OR--12"), None);
    }

    #[test]
    fn next_value_is_max_plus_one() {
        assert_eq!(next_value("OR-", Vec::<&str>::new()), 1);
        assert_eq!(next_value("OR-", ["OR-000009", "OR-000010", "OR-000002"]), 11);
        // overflowed padding still sorts numerically
        assert_eq!(next_value("OR-", ["OR-999999", "OR-1000000"]), 1_000_001);
        // legacy or hand-edited numbers are skipped
        assert_eq!(next_value("OR-", ["OR-000003", "IMPORTED-77"]), 4);
    }

    #[test]
    fn backoff_grows_and_stays_within_jitter_bounds() {
        let base = Duration::from_millis(10);
        for attempt in 1..=4 {
            let floor = base * (1 << (attempt - 1));
            let delay = backoff(attempt, base);
            assert!(delay >= floor, "attempt {attempt}: {delay:?} < {floor:?}");
            assert!(delay <= floor * 2, "attempt {attempt}: {delay:?} > {:?}", floor * 2);
        }
        assert_eq!(backoff(1, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn settings_follow_config() {
        let settings = SequenceSettings::default();
        assert_eq!(settings.prefix(DocumentKind::RepairOrder), "OR-");
        assert_eq!(settings.prefix(DocumentKind::PurchaseOrder), "OC-");
        assert_eq!(DocumentKind::Sale.constraint(), "sales_number_unique");
    }
}
