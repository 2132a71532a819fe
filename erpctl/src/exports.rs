//! CSV renderings of the liquidation report, the sales listing and the repair-order listing.
//!
//! Money columns are written as plain decimals with two places; timestamps use RFC 3339.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::models::sales::SaleStatus;
use crate::cash::PaymentMethod;
use crate::db::models::{reports::RepairExportRow, sales::SaleDBResponse};
use crate::errors::Error;
use crate::inventory::LiquidationReport;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

fn write_records<T: Serialize>(records: impl IntoIterator<Item = T>) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record).map_err(|e| Error::Internal {
            operation: format!("write CSV record: {e}"),
        })?;
    }
    writer.into_inner().map_err(|e| Error::Internal {
        operation: format!("flush CSV: {e}"),
    })
}

#[derive(Serialize)]
struct LiquidationRecord<'a> {
    sku: &'a str,
    name: &'a str,
    category: &'a str,
    stock: i64,
    cost_price: Decimal,
    sale_price: Decimal,
    cost_value: Decimal,
    retail_value: Decimal,
    potential_profit: Decimal,
    margin_pct: Option<Decimal>,
}

/// One row per product, then one `TOTAL` row with the grand totals.
pub fn liquidation_csv(report: &LiquidationReport) -> Result<Vec<u8>, Error> {
    let lines = report.lines.iter().map(|line| LiquidationRecord {
        sku: line.row.sku.as_deref().unwrap_or_default(),
        name: &line.row.name,
        category: line.row.category.as_deref().unwrap_or_default(),
        stock: i64::from(line.row.stock),
        cost_price: line.row.cost_price,
        sale_price: line.row.sale_price,
        cost_value: line.cost_value,
        retail_value: line.retail_value,
        potential_profit: line.potential_profit,
        margin_pct: line.margin_pct,
    });
    let totals = LiquidationRecord {
        sku: "",
        name: "TOTAL",
        category: "",
        stock: report.totals.units,
        cost_price: Decimal::ZERO,
        sale_price: Decimal::ZERO,
        cost_value: report.totals.cost_value,
        retail_value: report.totals.retail_value,
        potential_profit: report.totals.potential_profit,
        margin_pct: report.totals.margin_pct,
    };
    write_records(lines.chain(std::iter::once(totals)))
}

#[derive(Serialize)]
struct SaleRecord<'a> {
    sale_number: &'a str,
    created_at: String,
    customer: &'a str,
    status: SaleStatus,
    payment_method: PaymentMethod,
    subtotal: Decimal,
    discount: Decimal,
    tax: Decimal,
    total: Decimal,
}

pub fn sales_csv(sales: &[SaleDBResponse]) -> Result<Vec<u8>, Error> {
    write_records(sales.iter().map(|sale| SaleRecord {
        sale_number: &sale.sale_number,
        created_at: sale.created_at.to_rfc3339(),
        customer: sale.customer_name.as_deref().unwrap_or_default(),
        status: sale.status,
        payment_method: sale.payment_method,
        subtotal: sale.subtotal,
        discount: sale.discount,
        tax: sale.tax,
        total: sale.total,
    }))
}

#[derive(Serialize)]
struct RepairRecord<'a> {
    order_number: &'a str,
    received_at: String,
    customer: &'a str,
    device: String,
    serial_number: &'a str,
    status: &'a str,
    technician: &'a str,
    labor_cost: Decimal,
    parts_cost: Decimal,
    total_cost: Decimal,
    paid: Decimal,
    balance: Decimal,
    delivered_at: String,
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

pub fn repairs_csv(rows: &[RepairExportRow]) -> Result<Vec<u8>, Error> {
    write_records(rows.iter().map(|row| RepairRecord {
        order_number: &row.order_number,
        received_at: row.received_at.to_rfc3339(),
        customer: &row.customer_name,
        device: [Some(row.device_type.as_str()), row.brand.as_deref(), row.model.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        serial_number: row.serial_number.as_deref().unwrap_or_default(),
        status: row.status.as_str(),
        technician: row.technician_name.as_deref().unwrap_or_default(),
        labor_cost: row.labor_cost,
        parts_cost: row.parts_cost,
        total_cost: row.total_cost,
        paid: row.paid,
        balance: (row.total_cost - row.paid).max(Decimal::ZERO),
        delivered_at: timestamp(row.delivered_at),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::LiquidationRow;
    use crate::repairs::RepairStatus;
    use std::str::FromStr;
    use uuid::Uuid;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn liquidation_has_header_lines_and_total() {
        let report = LiquidationReport::build(vec![LiquidationRow {
            product_id: Uuid::new_v4(),
            sku: Some("SCR-01".to_string()),
            name: "Screen, 6.1\"".to_string(),
            category: Some("Parts".to_string()),
            stock: 3,
            cost_price: d("10.00"),
            sale_price: d("25.00"),
        }]);

        let csv = text(liquidation_csv(&report).unwrap());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "sku,name,category,stock,cost_price,sale_price,cost_value,retail_value,potential_profit,margin_pct"
        );
        // embedded comma and quote are escaped
        assert!(lines[1].starts_with("SCR-01,\"Screen, 6.1\"\"\",Parts,3,10.00,25.00,30.00,75.00,45.00,"));
        assert!(lines[2].starts_with(",TOTAL,,3,0,0,30.00,75.00,45.00,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn sales_export_writes_methods_in_snake_case() {
        let now = Utc::now();
        let sale = SaleDBResponse {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            sale_number: "V-000042".to_string(),
            customer_id: None,
            customer_name: None,
            status: SaleStatus::Voided,
            payment_method: PaymentMethod::Transfer,
            subtotal: d("100.00"),
            discount: d("0.00"),
            tax: d("21.00"),
            total: d("121.00"),
            notes: None,
            created_by: None,
            created_at: now,
            voided_at: Some(now),
        };

        let csv = text(sales_csv(&[sale]).unwrap());
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("V-000042,"));
        assert!(row.ends_with(",,voided,transfer,100.00,0.00,21.00,121.00"));
    }

    #[test]
    fn repairs_export_computes_balance_and_device() {
        let row = RepairExportRow {
            order_number: "R-000007".to_string(),
            received_at: Utc::now(),
            customer_name: "Ana".to_string(),
            device_type: "Phone".to_string(),
            brand: Some("Acme".to_string()),
            model: None,
            serial_number: None,
            status: RepairStatus::Repaired,
            technician_name: None,
            labor_cost: d("30.00"),
            parts_cost: d("20.00"),
            total_cost: d("50.00"),
            paid: d("20.00"),
            delivered_at: None,
        };

        let csv = text(repairs_csv(&[row]).unwrap());
        let fields: Vec<&str> = csv.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(fields[3], "Phone Acme");
        assert_eq!(fields[5], "repaired");
        assert_eq!(fields[11], "30.00");
        assert_eq!(fields[12], "");
    }

    #[test]
    fn empty_listing_writes_nothing() {
        assert!(sales_csv(&[]).unwrap().is_empty());
    }
}
