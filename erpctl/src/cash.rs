//! Cash register reconciliation.
//!
//! Expected cash in the drawer is the opening float plus every cash sale and cash repair payment
//! taken since the register was opened. Card, transfer and other payments are reported for the
//! shift but never counted toward the drawer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::totals::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

/// Where a payment came from, for splitting cash into sales vs repair payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSource {
    Sale,
    RepairPayment,
}

/// Per-method totals for one register shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CashTotals {
    #[schema(value_type = String)]
    pub cash_sales: Decimal,
    #[schema(value_type = String)]
    pub cash_repair_payments: Decimal,
    #[schema(value_type = String)]
    pub card_total: Decimal,
    #[schema(value_type = String)]
    pub transfer_total: Decimal,
    #[schema(value_type = String)]
    pub other_total: Decimal,
}

impl CashTotals {
    pub fn add(&mut self, source: PaymentSource, method: PaymentMethod, amount: Decimal) {
        match (method, source) {
            (PaymentMethod::Cash, PaymentSource::Sale) => self.cash_sales += amount,
            (PaymentMethod::Cash, PaymentSource::RepairPayment) => self.cash_repair_payments += amount,
            (PaymentMethod::Card, _) => self.card_total += amount,
            (PaymentMethod::Transfer, _) => self.transfer_total += amount,
            (PaymentMethod::Other, _) => self.other_total += amount,
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (PaymentSource, PaymentMethod, Decimal)>) -> Self {
        let mut totals = Self::default();
        for (source, method, amount) in entries {
            totals.add(source, method, amount);
        }
        totals
    }

    pub fn cash_in(&self) -> Decimal {
        self.cash_sales + self.cash_repair_payments
    }

    pub fn grand_total(&self) -> Decimal {
        self.cash_in() + self.card_total + self.transfer_total + self.other_total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Balanced,
    /// More cash counted than expected
    Over,
    /// Less cash counted than expected
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reconciliation {
    #[schema(value_type = String)]
    pub opening_amount: Decimal,
    pub totals: CashTotals,
    #[schema(value_type = String)]
    pub expected_cash: Decimal,
    #[schema(value_type = String)]
    pub counted_cash: Decimal,
    /// `counted_cash - expected_cash`
    #[schema(value_type = String)]
    pub difference: Decimal,
    pub status: ReconciliationStatus,
}

impl Reconciliation {
    pub fn compute(opening_amount: Decimal, totals: CashTotals, counted_cash: Decimal) -> Self {
        let expected_cash = round_money(opening_amount + totals.cash_in());
        let counted_cash = round_money(counted_cash);
        let difference = counted_cash - expected_cash;
        let status = if difference.is_zero() {
            ReconciliationStatus::Balanced
        } else if difference.is_sign_positive() {
            ReconciliationStatus::Over
        } else {
            ReconciliationStatus::Short
        };
        Self {
            opening_amount,
            totals,
            expected_cash,
            counted_cash,
            difference,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn shift() -> CashTotals {
        CashTotals::from_entries([
            (PaymentSource::Sale, PaymentMethod::Cash, d("120.00")),
            (PaymentSource::Sale, PaymentMethod::Card, d("300.00")),
            (PaymentSource::RepairPayment, PaymentMethod::Cash, d("45.50")),
            (PaymentSource::RepairPayment, PaymentMethod::Transfer, d("80.00")),
            (PaymentSource::Sale, PaymentMethod::Other, d("5.00")),
        ])
    }

    #[test]
    fn totals_split_by_method_and_source() {
        let totals = shift();
        assert_eq!(totals.cash_sales, d("120.00"));
        assert_eq!(totals.cash_repair_payments, d("45.50"));
        assert_eq!(totals.card_total, d("300.00"));
        assert_eq!(totals.transfer_total, d("80.00"));
        assert_eq!(totals.other_total, d("5.00"));
        assert_eq!(totals.grand_total(), d("550.50"));
    }

    #[test]
    fn expected_cash_ignores_non_cash_methods() {
        let rec = Reconciliation::compute(d("200"), shift(), d("365.50"));
        assert_eq!(rec.expected_cash, d("365.50"));
        assert_eq!(rec.difference, Decimal::ZERO);
        assert_eq!(rec.status, ReconciliationStatus::Balanced);
    }

    #[test]
    fn over_and_short_are_signed_differences() {
        let over = Reconciliation::compute(d("200"), shift(), d("370"));
        assert_eq!(over.status, ReconciliationStatus::Over);
        assert_eq!(over.difference, d("4.50"));

        let short = Reconciliation::compute(d("200"), shift(), d("360"));
        assert_eq!(short.status, ReconciliationStatus::Short);
        assert_eq!(short.difference, d("-5.50"));
    }

    #[test]
    fn empty_shift_expects_the_opening_float() {
        let rec = Reconciliation::compute(d("150"), CashTotals::default(), d("150"));
        assert_eq!(rec.expected_cash, d("150"));
        assert_eq!(rec.status, ReconciliationStatus::Balanced);
    }
}
