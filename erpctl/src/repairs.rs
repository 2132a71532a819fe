//! Repair order workflow rules: the status lifecycle, payment balance, and cost breakdown.
//!
//! The functions here are pure; [`crate::db::handlers::repair_orders`] applies their results
//! inside a tenant-scoped transaction.
//!
//! ## Status lifecycle
//!
//! ```text
//! received ─┬─> diagnosing ─> waiting_parts ─> repairing ─> repaired ─> delivered
//!           └──────────── any active status may jump to any other ──────────┘
//!             any other status ──> cancelled
//! ```
//!
//! `delivered` and `cancelled` are closed and active-order listings exclude them. A delivered
//! order can still be cancelled (a returned device); `cancelled` is final. Moving to `repaired` stamps `completed_at`; moving to `delivered`
//! stamps `delivered_at` (and `completed_at` when the order skipped `repaired`). Both notify
//! the customer by email.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{Error, Result};
use crate::totals::{LineInput, check_amount, round_money, sum_amounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    Received,
    Diagnosing,
    WaitingParts,
    Repairing,
    Repaired,
    Delivered,
    Cancelled,
}

impl RepairStatus {
    pub const ALL: [RepairStatus; 7] = [
        RepairStatus::Received,
        RepairStatus::Diagnosing,
        RepairStatus::WaitingParts,
        RepairStatus::Repairing,
        RepairStatus::Repaired,
        RepairStatus::Delivered,
        RepairStatus::Cancelled,
    ];

    /// Statuses shown in active-order queues.
    pub const ACTIVE: [RepairStatus; 5] = [
        RepairStatus::Received,
        RepairStatus::Diagnosing,
        RepairStatus::WaitingParts,
        RepairStatus::Repairing,
        RepairStatus::Repaired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStatus::Received => "received",
            RepairStatus::Diagnosing => "diagnosing",
            RepairStatus::WaitingParts => "waiting_parts",
            RepairStatus::Repairing => "repairing",
            RepairStatus::Repaired => "repaired",
            RepairStatus::Delivered => "delivered",
            RepairStatus::Cancelled => "cancelled",
        }
    }

    /// Human label used in emails and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            RepairStatus::Received => "Received",
            RepairStatus::Diagnosing => "Diagnosing",
            RepairStatus::WaitingParts => "Waiting for parts",
            RepairStatus::Repairing => "Repairing",
            RepairStatus::Repaired => "Repaired",
            RepairStatus::Delivered => "Delivered",
            RepairStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, RepairStatus::Delivered | RepairStatus::Cancelled)
    }
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepairStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RepairStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::bad_request(format!("Unknown repair status '{s}'")))
    }
}

/// What a status change must write besides the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: RepairStatus,
    pub to: RepairStatus,
    pub stamp_completed: bool,
    pub stamp_delivered: bool,
    pub stamp_cancelled: bool,
    pub notify_customer: bool,
}

/// Validate a status change and describe its side effects.
pub fn plan_transition(from: RepairStatus, to: RepairStatus) -> Result<TransitionPlan> {
    if from == to {
        return Err(Error::bad_request(format!("Repair order is already in status '{to}'")));
    }
    if from.is_closed() && !(from == RepairStatus::Delivered && to == RepairStatus::Cancelled) {
        return Err(Error::bad_request(format!(
            "Repair order is {from} and can no longer change status"
        )));
    }

    Ok(TransitionPlan {
        from,
        to,
        stamp_completed: matches!(to, RepairStatus::Repaired | RepairStatus::Delivered),
        stamp_delivered: to == RepairStatus::Delivered,
        stamp_cancelled: to == RepairStatus::Cancelled,
        notify_customer: matches!(to, RepairStatus::Repaired | RepairStatus::Delivered),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing paid yet
    Pending,
    /// Something paid, balance outstanding
    Partial,
    /// Paid in full
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentSummary {
    #[schema(value_type = String)]
    pub total: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
    /// `total - paid`; negative only if the total was lowered after payments were taken
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub status: PaymentStatus,
}

impl PaymentSummary {
    pub fn compute(total: Decimal, payments: impl IntoIterator<Item = Decimal>) -> Self {
        let paid: Decimal = payments.into_iter().sum();
        let status = if paid <= Decimal::ZERO {
            PaymentStatus::Pending
        } else if paid >= total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };
        Self {
            total,
            paid,
            balance: total - paid,
            status,
        }
    }
}

/// A payment must be positive and must not exceed the outstanding balance.
pub fn validate_payment(amount: Decimal, summary: &PaymentSummary) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::bad_request("Payment amount must be greater than zero"));
    }
    if round_money(amount) != amount {
        return Err(Error::bad_request("Payment amount cannot have more than two decimal places"));
    }
    if amount > summary.balance {
        return Err(Error::bad_request(format!(
            "Payment of {amount} exceeds the outstanding balance of {}",
            summary.balance.max(Decimal::ZERO)
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostBreakdown {
    #[schema(value_type = String)]
    pub labor: Decimal,
    #[schema(value_type = String)]
    pub parts: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

/// Labor plus the sum of the repair's item lines.
pub fn cost_breakdown(labor: Decimal, items: &[LineInput]) -> Result<CostBreakdown> {
    check_amount("Labor cost", labor)?;
    let labor = round_money(labor);
    let parts = sum_amounts("Parts cost", items.iter().map(LineInput::total).collect::<Result<Vec<_>>>()?)?;
    Ok(CostBreakdown {
        labor,
        parts,
        total: sum_amounts("Repair total", [labor, parts])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in RepairStatus::ALL {
            assert_eq!(status.as_str().parse::<RepairStatus>().unwrap(), status);
        }
        assert!("fixed".parse::<RepairStatus>().is_err());
    }

    #[test]
    fn cancelled_is_terminal() {
        for target in RepairStatus::ALL {
            assert!(plan_transition(RepairStatus::Cancelled, target).is_err());
        }
        assert!(RepairStatus::ACTIVE.iter().all(|s| !s.is_closed()));
    }

    #[test]
    fn delivered_orders_can_only_be_cancelled() {
        for target in RepairStatus::ALL {
            let result = plan_transition(RepairStatus::Delivered, target);
            assert_eq!(result.is_ok(), target == RepairStatus::Cancelled, "delivered -> {target}");
        }
        let plan = plan_transition(RepairStatus::Delivered, RepairStatus::Cancelled).unwrap();
        assert!(plan.stamp_cancelled);
        assert!(!plan.notify_customer);
    }

    #[test]
    fn same_status_is_rejected() {
        let err = plan_transition(RepairStatus::Repairing, RepairStatus::Repairing).unwrap_err();
        assert!(err.user_message().contains("already"));
    }

    #[test]
    fn any_active_status_can_be_cancelled() {
        for from in RepairStatus::ACTIVE {
            let plan = plan_transition(from, RepairStatus::Cancelled).unwrap();
            assert!(plan.stamp_cancelled);
            assert!(!plan.notify_customer);
            assert!(!plan.stamp_completed);
        }
    }

    #[test]
    fn jumping_straight_to_delivered_is_allowed_and_stamps_both() {
        let plan = plan_transition(RepairStatus::Received, RepairStatus::Delivered).unwrap();
        assert!(plan.stamp_completed);
        assert!(plan.stamp_delivered);
        assert!(plan.notify_customer);
    }

    #[test]
    fn repaired_stamps_completion_and_notifies() {
        let plan = plan_transition(RepairStatus::Repairing, RepairStatus::Repaired).unwrap();
        assert!(plan.stamp_completed);
        assert!(!plan.stamp_delivered);
        assert!(plan.notify_customer);

        let plan = plan_transition(RepairStatus::Received, RepairStatus::Diagnosing).unwrap();
        assert!(!plan.notify_customer);
        assert!(!plan.stamp_completed);
    }

    #[test]
    fn payment_status_buckets() {
        let pending = PaymentSummary::compute(d("100"), Vec::<Decimal>::new());
        assert_eq!(pending.status, PaymentStatus::Pending);
        assert_eq!(pending.balance, d("100"));

        let partial = PaymentSummary::compute(d("100"), [d("30"), d("20.50")]);
        assert_eq!(partial.status, PaymentStatus::Partial);
        assert_eq!(partial.paid, d("50.50"));
        assert_eq!(partial.balance, d("49.50"));

        let paid = PaymentSummary::compute(d("100"), [d("60"), d("40")]);
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.balance, Decimal::ZERO);
    }

    #[test]
    fn payments_cannot_exceed_balance() {
        let summary = PaymentSummary::compute(d("80"), [d("50")]);
        assert!(validate_payment(d("30"), &summary).is_ok());
        assert!(validate_payment(d("30.01"), &summary).is_err());
        assert!(validate_payment(Decimal::ZERO, &summary).is_err());
        assert!(validate_payment(d("-5"), &summary).is_err());
        assert!(validate_payment(d("1.001"), &summary).is_err());
    }

    #[test]
    fn cost_breakdown_sums_labor_and_parts() {
        let items = [
            LineInput {
                quantity: 1,
                unit_price: d("45.00"),
            },
            LineInput {
                quantity: 2,
                unit_price: d("3.25"),
            },
        ];
        let costs = cost_breakdown(d("25"), &items).unwrap();
        assert_eq!(costs.parts, d("51.50"));
        assert_eq!(costs.total, d("76.50"));
        assert!(cost_breakdown(d("-1"), &items).is_err());
    }

    #[test]
    fn cost_breakdown_rejects_totals_past_the_money_limit() {
        let items = [LineInput {
            quantity: 1,
            unit_price: crate::totals::MAX_AMOUNT,
        }];
        let err = cost_breakdown(d("0.01"), &items).unwrap_err();
        assert_eq!(err.user_message(), "Repair total cannot exceed 9999999999.99");
    }
}
