//! API request/response models for the cash register.

use super::pagination::Pagination;
use crate::cash::{CashTotals, Reconciliation, ReconciliationStatus};
use crate::db::models::cash_register::{CashClosureDBResponse, CashOpeningDBResponse};
use crate::errors::Result;
use crate::totals::check_amount;
use crate::types::{CashOpeningId, ProfileId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CashOpenRequest {
    /// Float placed in the drawer
    #[schema(value_type = String)]
    pub opening_amount: Decimal,
    pub notes: Option<String>,
}

impl CashOpenRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("Opening amount", self.opening_amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CashCloseRequest {
    /// Cash physically counted in the drawer
    #[schema(value_type = String)]
    pub counted_cash: Decimal,
    pub notes: Option<String>,
}

impl CashCloseRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("Counted cash", self.counted_cash)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CashOpeningResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CashOpeningId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub opened_by: Option<ProfileId>,
    pub opened_by_name: Option<String>,
    #[schema(value_type = String)]
    pub opening_amount: Decimal,
    pub notes: Option<String>,
    pub opened_at: DateTime<Utc>,
}

impl From<CashOpeningDBResponse> for CashOpeningResponse {
    fn from(db: CashOpeningDBResponse) -> Self {
        Self {
            id: db.id,
            opened_by: db.opened_by,
            opened_by_name: db.opened_by_name,
            opening_amount: db.opening_amount,
            notes: db.notes,
            opened_at: db.opened_at,
        }
    }
}

/// The open shift with its running totals.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentRegisterResponse {
    pub opening: CashOpeningResponse,
    pub totals: CashTotals,
    /// Opening float plus cash taken so far
    #[schema(value_type = String)]
    pub expected_cash: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CashClosureResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub opening_id: CashOpeningId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub closed_by: Option<ProfileId>,
    pub closed_by_name: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub reconciliation: Reconciliation,
    pub notes: Option<String>,
}

impl From<CashClosureDBResponse> for CashClosureResponse {
    fn from(db: CashClosureDBResponse) -> Self {
        let totals = CashTotals {
            cash_sales: db.cash_sales,
            cash_repair_payments: db.cash_repair_payments,
            card_total: db.card_total,
            transfer_total: db.transfer_total,
            other_total: db.other_total,
        };
        let status = if db.difference.is_zero() {
            ReconciliationStatus::Balanced
        } else if db.difference.is_sign_positive() {
            ReconciliationStatus::Over
        } else {
            ReconciliationStatus::Short
        };
        Self {
            id: db.id,
            opening_id: db.opening_id,
            closed_by: db.closed_by,
            closed_by_name: db.closed_by_name,
            opened_at: db.opened_at,
            closed_at: db.closed_at,
            reconciliation: Reconciliation {
                opening_amount: db.opening_amount,
                totals,
                expected_cash: db.expected_cash,
                counted_cash: db.counted_cash,
                difference: db.difference,
                status,
            },
            notes: db.notes,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListClosuresQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let open = CashOpenRequest {
            opening_amount: d("-1"),
            notes: None,
        };
        assert!(open.validate().is_err());
        let close = CashCloseRequest {
            counted_cash: d("0"),
            notes: None,
        };
        assert!(close.validate().is_ok());
    }

    #[test]
    fn stored_closure_rebuilds_reconciliation() {
        let now = Utc::now();
        let db = CashClosureDBResponse {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            opening_id: Uuid::new_v4(),
            closed_by: None,
            closed_by_name: None,
            opening_amount: d("100.00"),
            cash_sales: d("50.00"),
            cash_repair_payments: d("20.00"),
            card_total: d("10.00"),
            transfer_total: d("0"),
            other_total: d("0"),
            expected_cash: d("170.00"),
            counted_cash: d("165.00"),
            difference: d("-5.00"),
            notes: None,
            opened_at: now,
            closed_at: now,
        };
        let response = CashClosureResponse::from(db);
        assert_eq!(response.reconciliation.status, ReconciliationStatus::Short);
        assert_eq!(response.reconciliation.totals.cash_in(), d("70.00"));
    }
}
