//! Stock movement reasons, low-stock rules, and the inventory liquidation report.
//!
//! The liquidation report values the stock on hand at cost and at retail, per product and per
//! category, and the potential profit if everything sold at list price.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{Error, Result};
use crate::totals::round_money;
use crate::types::ProductId;

/// Why a product's stock changed. Every change writes a `stock_movements` row with one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Sale,
    SaleVoid,
    Purchase,
    RepairUsage,
    RepairReversal,
    Adjustment,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Sale => "sale",
            MovementReason::SaleVoid => "sale_void",
            MovementReason::Purchase => "purchase",
            MovementReason::RepairUsage => "repair_usage",
            MovementReason::RepairReversal => "repair_reversal",
            MovementReason::Adjustment => "adjustment",
        }
    }
}

/// At or below the configured minimum. A product with `min_stock = 0` is low only when empty.
pub fn is_low_stock(stock: i32, min_stock: i32) -> bool {
    stock <= min_stock
}

/// Folds document lines into one quantity per product.
///
/// Iteration is ordered by product id, so every transaction that touches several products locks
/// their rows in the same order.
pub fn merge_quantities(lines: impl IntoIterator<Item = (ProductId, i32)>) -> Result<BTreeMap<ProductId, i32>> {
    let mut merged = BTreeMap::new();
    for (product_id, quantity) in lines {
        let entry: &mut i32 = merged.entry(product_id).or_default();
        *entry = entry
            .checked_add(quantity)
            .ok_or_else(|| Error::bad_request("Combined quantity for a product is too large"))?;
    }
    Ok(merged)
}

/// One active product with stock on hand, as read for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct LiquidationRow {
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub stock: i32,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
    #[schema(value_type = String)]
    pub sale_price: Decimal,
}

impl LiquidationRow {
    pub fn cost_value(&self) -> Decimal {
        round_money(self.cost_price * Decimal::from(self.stock))
    }

    pub fn retail_value(&self) -> Decimal {
        round_money(self.sale_price * Decimal::from(self.stock))
    }

    pub fn potential_profit(&self) -> Decimal {
        self.retail_value() - self.cost_value()
    }

    /// Gross margin on retail, in percent. `None` when there is no retail value.
    pub fn margin_pct(&self) -> Option<Decimal> {
        margin(self.potential_profit(), self.retail_value())
    }
}

fn margin(profit: Decimal, retail: Decimal) -> Option<Decimal> {
    if retail.is_zero() {
        None
    } else {
        Some(round_money(profit * Decimal::ONE_HUNDRED / retail))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiquidationLine {
    #[serde(flatten)]
    pub row: LiquidationRow,
    #[schema(value_type = String)]
    pub cost_value: Decimal,
    #[schema(value_type = String)]
    pub retail_value: Decimal,
    #[schema(value_type = String)]
    pub potential_profit: Decimal,
    #[schema(value_type = Option<String>)]
    pub margin_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiquidationTotals {
    pub products: usize,
    pub units: i64,
    #[schema(value_type = String)]
    pub cost_value: Decimal,
    #[schema(value_type = String)]
    pub retail_value: Decimal,
    #[schema(value_type = String)]
    pub potential_profit: Decimal,
    #[schema(value_type = Option<String>)]
    pub margin_pct: Option<Decimal>,
}

impl LiquidationTotals {
    fn add(&mut self, line: &LiquidationLine) {
        self.products += 1;
        self.units += i64::from(line.row.stock);
        self.cost_value += line.cost_value;
        self.retail_value += line.retail_value;
        self.potential_profit += line.potential_profit;
        self.margin_pct = margin(self.potential_profit, self.retail_value);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategorySubtotal {
    /// `None` groups products without a category
    pub category: Option<String>,
    pub totals: LiquidationTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiquidationReport {
    pub lines: Vec<LiquidationLine>,
    pub categories: Vec<CategorySubtotal>,
    pub totals: LiquidationTotals,
}

impl LiquidationReport {
    /// Lines are ordered by category (uncategorized last) then product name.
    pub fn build(mut rows: Vec<LiquidationRow>) -> Self {
        rows.sort_by(|a, b| {
            (a.category.is_none(), &a.category, &a.name).cmp(&(b.category.is_none(), &b.category, &b.name))
        });

        let mut lines = Vec::with_capacity(rows.len());
        let mut categories: Vec<CategorySubtotal> = Vec::new();
        let mut totals = LiquidationTotals::default();

        for row in rows {
            let line = LiquidationLine {
                cost_value: row.cost_value(),
                retail_value: row.retail_value(),
                potential_profit: row.potential_profit(),
                margin_pct: row.margin_pct(),
                row,
            };

            match categories.last_mut() {
                Some(current) if current.category == line.row.category => current.totals.add(&line),
                _ => {
                    let mut subtotal = CategorySubtotal {
                        category: line.row.category.clone(),
                        totals: LiquidationTotals::default(),
                    };
                    subtotal.totals.add(&line);
                    categories.push(subtotal);
                }
            }
            totals.add(&line);
            lines.push(line);
        }

        Self {
            lines,
            categories,
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn row(name: &str, category: Option<&str>, stock: i32, cost: &str, sale: &str) -> LiquidationRow {
        LiquidationRow {
            product_id: Uuid::new_v4(),
            sku: None,
            name: name.to_string(),
            category: category.map(str::to_string),
            stock,
            cost_price: d(cost),
            sale_price: d(sale),
        }
    }

    #[test]
    fn low_stock_is_inclusive_of_minimum() {
        assert!(is_low_stock(2, 2));
        assert!(is_low_stock(0, 0));
        assert!(!is_low_stock(3, 2));
    }

    #[test]
    fn merged_quantities_come_out_in_product_order() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let merged = merge_quantities([(b, 2), (a, 1), (b, 3)]).unwrap();
        assert_eq!(merged.into_iter().collect::<Vec<_>>(), [(a, 1), (b, 5)]);
    }

    #[test]
    fn merging_repeated_lines_does_not_overflow() {
        let a = Uuid::from_u128(1);
        let err = merge_quantities([(a, i32::MAX), (a, 1)]).unwrap_err();
        assert_eq!(err.user_message(), "Combined quantity for a product is too large");
    }

    #[test]
    fn largest_stored_values_still_produce_a_report() {
        let r = row("Bulk", None, i32::MAX, "9999999999.99", "9999999999.99");
        let report = LiquidationReport::build(vec![r.clone(), r]);
        assert_eq!(report.totals.units, 2 * i64::from(i32::MAX));
        assert_eq!(report.totals.potential_profit, Decimal::ZERO);
        assert_eq!(report.totals.margin_pct, Some(Decimal::ZERO));
    }

    #[test]
    fn row_values_and_margin() {
        let r = row("Screen", Some("Parts"), 4, "25.00", "40.00");
        assert_eq!(r.cost_value(), d("100.00"));
        assert_eq!(r.retail_value(), d("160.00"));
        assert_eq!(r.potential_profit(), d("60.00"));
        assert_eq!(r.margin_pct(), Some(d("37.50")));

        let free = row("Sticker", None, 10, "0.10", "0");
        assert_eq!(free.margin_pct(), None);
    }

    #[test]
    fn report_groups_by_category_with_grand_totals() {
        let report = LiquidationReport::build(vec![
            row("Case", Some("Accessories"), 10, "2.00", "5.00"),
            row("Battery", Some("Parts"), 3, "10.00", "18.00"),
            row("Cable", None, 5, "1.00", "3.00"),
            row("Charger", Some("Accessories"), 2, "6.00", "12.00"),
        ]);

        let names: Vec<&str> = report.lines.iter().map(|l| l.row.name.as_str()).collect();
        assert_eq!(names, ["Case", "Charger", "Battery", "Cable"]);

        assert_eq!(report.categories.len(), 3);
        let accessories = &report.categories[0];
        assert_eq!(accessories.category.as_deref(), Some("Accessories"));
        assert_eq!(accessories.totals.products, 2);
        assert_eq!(accessories.totals.units, 12);
        assert_eq!(accessories.totals.cost_value, d("32.00"));
        assert_eq!(accessories.totals.retail_value, d("74.00"));
        assert_eq!(report.categories[2].category, None);

        assert_eq!(report.totals.products, 4);
        assert_eq!(report.totals.cost_value, d("67.00"));
        assert_eq!(report.totals.retail_value, d("143.00"));
        assert_eq!(report.totals.potential_profit, d("76.00"));
        assert_eq!(report.totals.margin_pct, Some(d("53.15")));
    }

    #[test]
    fn empty_report_has_zero_totals() {
        let report = LiquidationReport::build(Vec::new());
        assert!(report.lines.is_empty());
        assert_eq!(report.totals.retail_value, Decimal::ZERO);
        assert_eq!(report.totals.margin_pct, None);
    }
}
