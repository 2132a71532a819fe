//! Money arithmetic shared by sales, quotes, purchase orders and repairs.
//!
//! All amounts are `rust_decimal::Decimal` and are rounded to cents with midpoint-away-from-zero
//! (`2.345` becomes `2.35`), never banker's rounding.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest amount a `NUMERIC(12, 2)` column holds: `9999999999.99`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Largest quantity accepted on a single line or stock adjustment.
pub const MAX_QUANTITY: i32 = 1_000_000;

/// Round to two decimal places, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Non-negative and storable.
pub fn check_amount(field: &str, amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() {
        return Err(Error::bad_request(format!("{field} cannot be negative")));
    }
    if amount > MAX_AMOUNT {
        return Err(Error::bad_request(format!("{field} cannot exceed {MAX_AMOUNT}")));
    }
    Ok(())
}

pub fn check_quantity(quantity: i32) -> Result<()> {
    if quantity <= 0 {
        return Err(Error::bad_request("Quantity must be greater than zero"));
    }
    if quantity > MAX_QUANTITY {
        return Err(Error::bad_request(format!("Quantity cannot exceed {MAX_QUANTITY}")));
    }
    Ok(())
}

fn too_large(what: &str) -> Error {
    Error::bad_request(format!("{what} cannot exceed {MAX_AMOUNT}"))
}

/// `quantity * unit_price`, rounded. Fails when the result would not fit a money column.
pub fn line_total(quantity: i32, unit_price: Decimal) -> Result<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(round_money)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(|| too_large("Line total"))
}

/// Sum of amounts, bounded by [`MAX_AMOUNT`].
pub fn sum_amounts(what: &str, amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount).filter(|sum| *sum <= MAX_AMOUNT))
        .ok_or_else(|| too_large(what))
}

/// One priced line as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInput {
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl LineInput {
    pub fn validate(&self) -> Result<()> {
        check_quantity(self.quantity)?;
        check_amount("Unit price", self.unit_price)
    }

    pub fn total(&self) -> Result<Decimal> {
        line_total(self.quantity, self.unit_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DocumentTotals {
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

impl DocumentTotals {
    /// Sum the lines, subtract an absolute discount, then apply `tax_rate` percent to the rest.
    pub fn compute(lines: &[LineInput], discount: Decimal, tax_rate: Decimal) -> Result<Self> {
        if lines.is_empty() {
            return Err(Error::bad_request("At least one item is required"));
        }
        for line in lines {
            line.validate()?;
        }
        check_amount("Discount", discount)?;
        check_tax_rate(tax_rate)?;

        let totals = lines.iter().map(LineInput::total).collect::<Result<Vec<_>>>()?;
        let subtotal = sum_amounts("Subtotal", totals)?;
        let discount = round_money(discount);
        if discount > subtotal {
            return Err(Error::bad_request(format!(
                "Discount ({discount}) cannot exceed the subtotal ({subtotal})"
            )));
        }
        let taxable = subtotal - discount;
        // taxable and tax_rate are both bounded, so the product fits
        let tax = round_money(taxable * tax_rate / Decimal::ONE_HUNDRED);

        Ok(Self {
            subtotal,
            discount,
            tax,
            total: sum_amounts("Total", [taxable, tax])?,
        })
    }
}

pub fn check_tax_rate(tax_rate: Decimal) -> Result<()> {
    if tax_rate.is_sign_negative() || tax_rate > Decimal::ONE_HUNDRED {
        return Err(Error::bad_request("Tax rate must be between 0 and 100"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_money(d("2.345")), d("2.35"));
        assert_eq!(round_money(d("2.355")), d("2.36"));
        assert_eq!(round_money(d("-2.345")), d("-2.35"));
        assert_eq!(round_money(d("2.344")), d("2.34"));
    }

    #[test]
    fn document_totals_apply_discount_before_tax() {
        let lines = [
            LineInput {
                quantity: 2,
                unit_price: d("15.50"),
            },
            LineInput {
                quantity: 1,
                unit_price: d("9.00"),
            },
        ];
        let totals = DocumentTotals::compute(&lines, d("5"), d("16")).unwrap();
        assert_eq!(totals.subtotal, d("40.00"));
        assert_eq!(totals.discount, d("5"));
        assert_eq!(totals.tax, d("5.60"));
        assert_eq!(totals.total, d("40.60"));
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let line = LineInput {
            quantity: 1,
            unit_price: d("10"),
        };
        assert!(DocumentTotals::compute(&[], Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(DocumentTotals::compute(&[line], d("10.01"), Decimal::ZERO).is_err());
        assert!(DocumentTotals::compute(&[line], d("-1"), Decimal::ZERO).is_err());
        assert!(DocumentTotals::compute(&[line], Decimal::ZERO, d("101")).is_err());

        let zero_qty = LineInput {
            quantity: 0,
            unit_price: d("10"),
        };
        assert!(DocumentTotals::compute(&[zero_qty], Decimal::ZERO, Decimal::ZERO).is_err());
    }

    #[test]
    fn max_amount_matches_the_money_columns() {
        assert_eq!(MAX_AMOUNT, d("9999999999.99"));
        assert!(check_amount("Price", MAX_AMOUNT).is_ok());
        assert!(check_amount("Price", d("10000000000")).is_err());
    }

    #[test]
    fn oversized_lines_are_rejected_instead_of_overflowing() {
        let huge = LineInput {
            quantity: 2,
            unit_price: Decimal::MAX,
        };
        assert!(DocumentTotals::compute(&[huge], Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(line_total(i32::MAX, Decimal::MAX).is_err());

        // Each line fits, their sum does not
        let big = LineInput {
            quantity: 1,
            unit_price: MAX_AMOUNT,
        };
        let err = DocumentTotals::compute(&[big, big], Decimal::ZERO, Decimal::ZERO).unwrap_err();
        assert_eq!(err.user_message(), "Subtotal cannot exceed 9999999999.99");

        let many = LineInput {
            quantity: MAX_QUANTITY + 1,
            unit_price: d("1"),
        };
        assert!(DocumentTotals::compute(&[many], Decimal::ZERO, Decimal::ZERO).is_err());
    }

    #[test]
    fn tax_cannot_push_the_total_past_the_limit() {
        let line = LineInput {
            quantity: 1,
            unit_price: MAX_AMOUNT,
        };
        assert!(DocumentTotals::compute(&[line], Decimal::ZERO, d("16")).is_err());
        assert!(DocumentTotals::compute(&[line], Decimal::ZERO, Decimal::ZERO).is_ok());
    }

    #[test]
    fn full_discount_is_allowed() {
        let line = LineInput {
            quantity: 3,
            unit_price: d("1.10"),
        };
        let totals = DocumentTotals::compute(&[line], d("3.30"), d("16")).unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
