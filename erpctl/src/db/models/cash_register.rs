//! Database models for cash register shifts.

use crate::cash::{PaymentMethod, PaymentSource};
use crate::types::{CashOpeningId, CompanyId, ProfileId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct CashOpeningDBResponse {
    pub id: CashOpeningId,
    pub company_id: CompanyId,
    pub opened_by: Option<ProfileId>,
    pub opened_by_name: Option<String>,
    pub opening_amount: Decimal,
    pub notes: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed: bool,
}

/// Sum of one payment method from one source since the register opened.
#[derive(Debug, Clone, FromRow)]
pub struct CashEntryRow {
    pub source: String,
    pub method: PaymentMethod,
    pub amount: Decimal,
}

impl CashEntryRow {
    pub fn into_entry(self) -> (PaymentSource, PaymentMethod, Decimal) {
        let source = if self.source == "sale" {
            PaymentSource::Sale
        } else {
            PaymentSource::RepairPayment
        };
        (source, self.method, self.amount)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CashClosureDBResponse {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub opening_id: CashOpeningId,
    pub closed_by: Option<ProfileId>,
    pub closed_by_name: Option<String>,
    pub opening_amount: Decimal,
    pub cash_sales: Decimal,
    pub cash_repair_payments: Decimal,
    pub card_total: Decimal,
    pub transfer_total: Decimal,
    pub other_total: Decimal,
    pub expected_cash: Decimal,
    pub counted_cash: Decimal,
    pub difference: Decimal,
    pub notes: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}
