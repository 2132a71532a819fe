//! End-to-end tests against a real Postgres database.
//!
//! Each test gets a fresh, migrated database from `#[sqlx::test]` and drives the full router.

use crate::{
    api::models::profiles::{CurrentUser, Role},
    bootstrap_company,
    config::{BootstrapConfig, EmailTransportConfig},
    db::begin_scoped,
    test_utils::{bearer_for, create_test_app, create_test_app_with, create_test_company, create_test_config, create_test_profile},
};
use axum::http::StatusCode;
use axum_test::TestServer;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use std::str::FromStr;

fn dec(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("money is serialized as a string")).expect("valid decimal")
}

async fn create_customer(server: &TestServer, auth: &str, name: &str) -> Value {
    let response = server
        .post("/api/v1/customers")
        .add_header("authorization", auth)
        .json(&json!({ "name": name, "phone": "555-0100" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn create_product(server: &TestServer, auth: &str, name: &str, price: &str, stock: i32, min_stock: i32) -> Value {
    let response = server
        .post("/api/v1/products")
        .add_header("authorization", auth)
        .json(&json!({
            "name": name,
            "cost_price": "10.00",
            "sale_price": price,
            "stock": stock,
            "min_stock": min_stock,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn stock_of(server: &TestServer, auth: &str, product_id: &Value) -> i64 {
    let product: Value = server
        .get(&format!("/api/v1/products/{}", product_id.as_str().unwrap()))
        .add_header("authorization", auth)
        .await
        .json();
    product["stock"].as_i64().unwrap()
}

async fn cash_sale(server: &TestServer, auth: &str, product_id: &Value, quantity: i32) -> axum_test::TestResponse {
    server
        .post("/api/v1/sales")
        .add_header("authorization", auth)
        .json(&json!({
            "payment_method": "cash",
            "items": [{ "product_id": product_id, "quantity": quantity }],
            "tax_rate": "0",
        }))
        .await
}

#[sqlx::test]
#[test_log::test]
async fn repair_order_runs_from_intake_to_delivery(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);

    let customer = create_customer(&server, &auth, "Ana Perez").await;
    let screen = create_product(&server, &auth, "Screen", "30.00", 2, 1).await;

    let response = server
        .post("/api/v1/repairs")
        .add_header("authorization", &auth)
        .json(&json!({
            "customer_id": customer["id"],
            "device_type": "Phone",
            "brand": "Acme",
            "reported_issue": "Cracked screen",
            "labor_cost": "50.00",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let order: Value = response.json();
    assert_eq!(order["order_number"], "OR-000001");
    assert_eq!(order["status"], "received");
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = server
        .post(&format!("/api/v1/repairs/{order_id}/items"))
        .add_header("authorization", &auth)
        .json(&json!({ "product_id": screen["id"], "quantity": 1 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let item: Value = response.json();
    assert_eq!(item["used"], false);
    // Adding a part reserves nothing
    assert_eq!(stock_of(&server, &auth, &screen["id"]).await, 2);

    server
        .post(&format!("/api/v1/repairs/{order_id}/items/{}/use", item["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .await
        .assert_status_ok();
    assert_eq!(stock_of(&server, &auth, &screen["id"]).await, 1);

    // Using the same part twice is rejected and stock stays put
    server
        .post(&format!("/api/v1/repairs/{order_id}/items/{}/use", item["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&server, &auth, &screen["id"]).await, 1);

    let detail: Value = server
        .get(&format!("/api/v1/repairs/{order_id}"))
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(dec(&detail["total_cost"]), Decimal::from(80));
    assert_eq!(detail["payment"]["status"], "pending");

    // Sub-cent amounts are refused, not rounded
    let response = server
        .post(&format!("/api/v1/repairs/{order_id}/payments"))
        .add_header("authorization", &auth)
        .json(&json!({ "amount": "1.005", "method": "cash" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Payment amount cannot have more than two decimal places"
    );

    let response = server
        .post(&format!("/api/v1/repairs/{order_id}/payments"))
        .add_header("authorization", &auth)
        .json(&json!({ "amount": "30.00", "method": "cash" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let receipt: Value = response.json();
    assert_eq!(receipt["summary"]["status"], "partial");
    assert_eq!(dec(&receipt["summary"]["balance"]), Decimal::from(50));

    // More than the balance is refused
    server
        .post(&format!("/api/v1/repairs/{order_id}/payments"))
        .add_header("authorization", &auth)
        .json(&json!({ "amount": "60.00", "method": "card" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let receipt: Value = server
        .post(&format!("/api/v1/repairs/{order_id}/payments"))
        .add_header("authorization", &auth)
        .json(&json!({ "amount": "50.00", "method": "card" }))
        .await
        .json();
    assert_eq!(receipt["summary"]["status"], "paid");
    assert!(dec(&receipt["summary"]["balance"]).is_zero());

    for status in ["repairing", "repaired", "delivered"] {
        server
            .post(&format!("/api/v1/repairs/{order_id}/status"))
            .add_header("authorization", &auth)
            .json(&json!({ "status": status }))
            .await
            .assert_status_ok();
    }

    // Delivered orders are closed
    server
        .post(&format!("/api/v1/repairs/{order_id}/status"))
        .add_header("authorization", &auth)
        .json(&json!({ "status": "repairing" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let detail: Value = server
        .get(&format!("/api/v1/repairs/{order_id}"))
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(detail["status"], "delivered");
    assert_eq!(detail["payments"].as_array().unwrap().len(), 2);

    // A returned device can still be cancelled, and that is final
    server
        .post(&format!("/api/v1/repairs/{order_id}/cancel"))
        .add_header("authorization", &auth)
        .await
        .assert_status_ok();
    server
        .post(&format!("/api/v1/repairs/{order_id}/status"))
        .add_header("authorization", &auth)
        .json(&json!({ "status": "delivered" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // The next order gets the next number
    let second: Value = server
        .post("/api/v1/repairs")
        .add_header("authorization", &auth)
        .json(&json!({
            "customer_id": customer["id"],
            "device_type": "Laptop",
            "reported_issue": "No power",
        }))
        .await
        .json();
    assert_eq!(second["order_number"], "OR-000002");
}

#[sqlx::test]
#[test_log::test]
async fn cancelled_repairs_return_used_parts_once(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);

    let customer = create_customer(&server, &auth, "Luis").await;
    let battery = create_product(&server, &auth, "Battery", "20.00", 5, 0).await;
    let order: Value = server
        .post("/api/v1/repairs")
        .add_header("authorization", &auth)
        .json(&json!({ "customer_id": customer["id"], "device_type": "Phone", "reported_issue": "Drains fast" }))
        .await
        .json();
    let order_id = order["id"].as_str().unwrap().to_string();

    let item: Value = server
        .post(&format!("/api/v1/repairs/{order_id}/items"))
        .add_header("authorization", &auth)
        .json(&json!({ "product_id": battery["id"], "quantity": 2 }))
        .await
        .json();
    server
        .post(&format!("/api/v1/repairs/{order_id}/items/{}/use", item["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .await
        .assert_status_ok();
    assert_eq!(stock_of(&server, &auth, &battery["id"]).await, 3);

    // Only cancelled orders can be reversed
    server
        .post(&format!("/api/v1/repairs/{order_id}/reverse-stock"))
        .add_header("authorization", &auth)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post(&format!("/api/v1/repairs/{order_id}/cancel"))
        .add_header("authorization", &auth)
        .await
        .assert_status_ok();

    let reversal: Value = server
        .post(&format!("/api/v1/repairs/{order_id}/reverse-stock"))
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(reversal["restored"].as_array().unwrap().len(), 1);
    assert_eq!(stock_of(&server, &auth, &battery["id"]).await, 5);

    let again: Value = server
        .post(&format!("/api/v1/repairs/{order_id}/reverse-stock"))
        .add_header("authorization", &auth)
        .await
        .json();
    assert!(again["restored"].as_array().unwrap().is_empty());
    assert_eq!(stock_of(&server, &auth, &battery["id"]).await, 5);
}

#[sqlx::test]
#[test_log::test]
async fn sales_deduct_stock_and_voids_restore_it(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);

    let cable = create_product(&server, &auth, "USB-C cable", "9.99", 3, 1).await;

    let response = cash_sale(&server, &auth, &cable["id"], 2).await;
    response.assert_status(StatusCode::CREATED);
    let sale: Value = response.json();
    assert_eq!(sale["sale_number"], "V-000001");
    assert_eq!(dec(&sale["total"]), Decimal::from_str("19.98").unwrap());
    assert_eq!(stock_of(&server, &auth, &cable["id"]).await, 1);

    // Crossing the minimum raised a low-stock notification
    let unread: Value = server
        .get("/api/v1/notifications/unread-count")
        .add_header("authorization", &auth)
        .await
        .json();
    assert!(unread["count"].as_i64().unwrap() >= 1);

    let response = cash_sale(&server, &auth, &cable["id"], 5).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Insufficient stock for USB-C cable"));
    assert_eq!(stock_of(&server, &auth, &cable["id"]).await, 1);

    // Prices past what a money column holds are refused up front
    let response = server
        .post("/api/v1/sales")
        .add_header("authorization", &auth)
        .json(&json!({
            "payment_method": "cash",
            "items": [{ "product_id": cable["id"], "quantity": 1, "unit_price": "10000000000.00" }],
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Unit price cannot exceed 9999999999.99");
    assert_eq!(stock_of(&server, &auth, &cable["id"]).await, 1);

    server
        .post(&format!("/api/v1/sales/{}/void", sale["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .json(&json!({ "reason": "Wrong item" }))
        .await
        .assert_status_ok();
    assert_eq!(stock_of(&server, &auth, &cable["id"]).await, 3);

    // A second void is refused
    server
        .post(&format!("/api/v1/sales/{}/void", sale["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let movements: Value = server
        .get(&format!("/api/v1/products/{}/movements", cable["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .await
        .json();
    // Opening stock, the sale and the void
    assert_eq!(movements["data"].as_array().unwrap().len(), 3);
}

#[sqlx::test]
#[test_log::test]
async fn concurrent_sales_get_distinct_numbers(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);
    let case = create_product(&server, &auth, "Case", "5.00", 100, 0).await;

    let responses = futures::future::join_all((0..6).map(|_| cash_sale(&server, &auth, &case["id"], 1))).await;

    let mut numbers: Vec<String> = responses
        .iter()
        .map(|response| {
            response.assert_status(StatusCode::CREATED);
            response.json::<Value>()["sale_number"].as_str().unwrap().to_string()
        })
        .collect();
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 6);
    assert_eq!(numbers.first().map(String::as_str), Some("V-000001"));
    assert_eq!(numbers.last().map(String::as_str), Some("V-000006"));
    assert_eq!(stock_of(&server, &auth, &case["id"]).await, 94);
}

#[sqlx::test]
#[test_log::test]
async fn overlapping_sales_and_voids_run_concurrently(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);
    let glass = create_product(&server, &auth, "Glass", "8.00", 50, 0).await;
    let case = create_product(&server, &auth, "Case", "12.00", 50, 0).await;

    // Half the sales list the products one way round, half the other
    let sales = futures::future::join_all((0..8).map(|i| {
        let (first, second) = if i % 2 == 0 { (&glass, &case) } else { (&case, &glass) };
        server
            .post("/api/v1/sales")
            .add_header("authorization", &auth)
            .json(&json!({
                "payment_method": "cash",
                "items": [
                    { "product_id": first["id"], "quantity": 1 },
                    { "product_id": second["id"], "quantity": 2 },
                ],
                "tax_rate": "0",
            }))
    }))
    .await;
    let ids: Vec<String> = sales
        .iter()
        .map(|response| {
            response.assert_status(StatusCode::CREATED);
            response.json::<Value>()["id"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(stock_of(&server, &auth, &glass["id"]).await, 38);
    assert_eq!(stock_of(&server, &auth, &case["id"]).await, 38);

    let voids = futures::future::join_all(ids.iter().map(|id| {
        server
            .post(&format!("/api/v1/sales/{id}/void"))
            .add_header("authorization", &auth)
            .json(&json!({}))
    }))
    .await;
    for response in &voids {
        response.assert_status_ok();
    }
    assert_eq!(stock_of(&server, &auth, &glass["id"]).await, 50);
    assert_eq!(stock_of(&server, &auth, &case["id"]).await, 50);
}

#[sqlx::test]
#[test_log::test]
async fn receiving_a_purchase_order_adds_stock_and_updates_cost(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);

    let response = server
        .post("/api/v1/suppliers")
        .add_header("authorization", &auth)
        .json(&json!({ "name": "Parts Wholesale" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let supplier: Value = response.json();
    let screen = create_product(&server, &auth, "Screen", "40.00", 2, 1).await;
    let battery = create_product(&server, &auth, "Battery", "15.00", 0, 0).await;

    let response = server
        .post("/api/v1/purchase-orders")
        .add_header("authorization", &auth)
        .json(&json!({
            "supplier_id": supplier["id"],
            "items": [
                { "product_id": screen["id"], "quantity": 5, "unit_cost": "12.50" },
                { "product_id": battery["id"], "quantity": 4, "unit_cost": "3.00" },
            ],
            "tax_rate": "10",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let order: Value = response.json();
    assert_eq!(order["order_number"], "OC-000001");
    assert_eq!(order["status"], "draft");
    assert_eq!(dec(&order["subtotal"]), Decimal::from_str("74.50").unwrap());
    assert_eq!(dec(&order["tax"]), Decimal::from_str("7.45").unwrap());
    assert_eq!(dec(&order["total"]), Decimal::from_str("81.95").unwrap());
    let order_id = order["id"].as_str().unwrap().to_string();

    // Nothing moves until the goods arrive
    server
        .post(&format!("/api/v1/purchase-orders/{order_id}/order"))
        .add_header("authorization", &auth)
        .await
        .assert_status_ok();
    assert_eq!(stock_of(&server, &auth, &screen["id"]).await, 2);

    let response = server
        .post(&format!("/api/v1/purchase-orders/{order_id}/receive"))
        .add_header("authorization", &auth)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "received");

    assert_eq!(stock_of(&server, &auth, &screen["id"]).await, 7);
    assert_eq!(stock_of(&server, &auth, &battery["id"]).await, 4);
    let product: Value = server
        .get(&format!("/api/v1/products/{}", screen["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(dec(&product["cost_price"]), Decimal::from_str("12.50").unwrap());

    let movements: Value = server
        .get(&format!("/api/v1/products/{}/movements", screen["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .await
        .json();
    let purchases: Vec<&Value> = movements["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["reason"] == "purchase")
        .collect();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0]["quantity"], 5);
    assert_eq!(purchases[0]["stock_after"], 7);
    assert_eq!(purchases[0]["reference_id"], order["id"]);

    // Receiving twice is refused and stock stays put
    server
        .post(&format!("/api/v1/purchase-orders/{order_id}/receive"))
        .add_header("authorization", &auth)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&server, &auth, &screen["id"]).await, 7);
}

#[sqlx::test]
#[test_log::test]
async fn converted_quotes_keep_their_discount_and_tax(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);

    let customer = create_customer(&server, &auth, "Rosa").await;
    let keyboard = create_product(&server, &auth, "Keyboard", "40.00", 5, 0).await;

    let response = server
        .post("/api/v1/quotes")
        .add_header("authorization", &auth)
        .json(&json!({
            "customer_id": customer["id"],
            "items": [{ "product_id": keyboard["id"], "quantity": 2 }],
            "discount": "10.00",
            "tax_rate": "21",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let quote: Value = response.json();
    assert_eq!(quote["quote_number"], "COT-000001");
    assert_eq!(dec(&quote["subtotal"]), Decimal::from(80));
    assert_eq!(dec(&quote["tax"]), Decimal::from_str("14.70").unwrap());
    assert_eq!(dec(&quote["total"]), Decimal::from_str("84.70").unwrap());
    // A quote reserves nothing
    assert_eq!(stock_of(&server, &auth, &keyboard["id"]).await, 5);

    let quote_id = quote["id"].as_str().unwrap().to_string();
    let response = server
        .post(&format!("/api/v1/quotes/{quote_id}/convert"))
        .add_header("authorization", &auth)
        .json(&json!({ "payment_method": "card" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let sale: Value = response.json();
    assert_eq!(sale["customer_id"], customer["id"]);
    assert_eq!(dec(&sale["discount"]), Decimal::from(10));
    assert_eq!(dec(&sale["tax"]), Decimal::from_str("14.70").unwrap());
    assert_eq!(dec(&sale["total"]), Decimal::from_str("84.70").unwrap());
    assert_eq!(stock_of(&server, &auth, &keyboard["id"]).await, 3);

    let quote: Value = server
        .get(&format!("/api/v1/quotes/{quote_id}"))
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(quote["status"], "converted");
    assert_eq!(quote["sale_id"], sale["id"]);

    server
        .post(&format!("/api/v1/quotes/{quote_id}/convert"))
        .add_header("authorization", &auth)
        .json(&json!({ "payment_method": "cash" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&server, &auth, &keyboard["id"]).await, 3);
}

#[sqlx::test]
#[test_log::test]
async fn reports_reflect_stock_sales_and_open_repairs(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);

    let screen = create_product(&server, &auth, "Screen", "40.00", 4, 1).await;
    // Out of stock: not in the liquidation report, counted as low stock
    create_product(&server, &auth, "Sticker", "1.00", 0, 0).await;

    cash_sale(&server, &auth, &screen["id"], 1).await.assert_status(StatusCode::CREATED);
    let voided: Value = cash_sale(&server, &auth, &screen["id"], 1).await.json();
    server
        .post(&format!("/api/v1/sales/{}/void", voided["id"].as_str().unwrap()))
        .add_header("authorization", &auth)
        .json(&json!({}))
        .await
        .assert_status_ok();

    let customer = create_customer(&server, &auth, "Iker").await;
    server
        .post("/api/v1/repairs")
        .add_header("authorization", &auth)
        .json(&json!({
            "customer_id": customer["id"],
            "device_type": "Console",
            "reported_issue": "Overheats",
            "labor_cost": "50.00",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let report: Value = server
        .get("/api/v1/reports/liquidation")
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(report["lines"].as_array().unwrap().len(), 1);
    assert_eq!(report["lines"][0]["name"], "Screen");
    assert_eq!(report["totals"]["units"], 3);
    assert_eq!(dec(&report["totals"]["cost_value"]), Decimal::from(30));
    assert_eq!(dec(&report["totals"]["retail_value"]), Decimal::from(120));
    assert_eq!(dec(&report["totals"]["potential_profit"]), Decimal::from(90));
    assert_eq!(dec(&report["totals"]["margin_pct"]), Decimal::from(75));

    let summary: Value = server
        .get("/api/v1/reports/sales-summary")
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(summary["totals"]["sale_count"], 1);
    assert_eq!(summary["totals"]["voided_count"], 1);
    assert_eq!(dec(&summary["totals"]["total"]), Decimal::from(40));
    assert_eq!(summary["by_method"].as_array().unwrap().len(), 1);
    assert_eq!(summary["by_method"][0]["method"], "cash");
    assert_eq!(summary["top_products"][0]["name"], "Screen");
    assert_eq!(summary["top_products"][0]["units"], 1);

    let dashboard: Value = server
        .get("/api/v1/reports/dashboard")
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(dashboard["active_repair_count"], 1);
    assert_eq!(dashboard["active_repairs"][0]["status"], "received");
    assert_eq!(dec(&dashboard["outstanding_balance"]), Decimal::from(50));
    assert_eq!(dashboard["low_stock_count"], 1);
    assert_eq!(dashboard["sales_today"], 1);
    assert_eq!(dec(&dashboard["sales_today_total"]), Decimal::from(40));
    assert_eq!(dashboard["register_open"], false);
}

#[sqlx::test]
#[test_log::test]
async fn repaired_and_delivered_orders_email_the_customer(pool: PgPool) {
    let emails = tempfile::tempdir().unwrap();
    let mut config = create_test_config();
    config.email.transport = EmailTransportConfig::File {
        path: emails.path().to_string_lossy().into_owned(),
    };
    let (server, bg) = create_test_app_with(pool.clone(), config.clone()).await;
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);

    let response = server
        .post("/api/v1/customers")
        .add_header("authorization", &auth)
        .json(&json!({ "name": "Nora", "email": "nora@example.com" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let with_email: Value = response.json();
    let without_email = create_customer(&server, &auth, "Pablo").await;

    for customer in [&with_email, &without_email] {
        let order: Value = server
            .post("/api/v1/repairs")
            .add_header("authorization", &auth)
            .json(&json!({ "customer_id": customer["id"], "device_type": "Phone", "reported_issue": "Dead speaker" }))
            .await
            .json();
        for status in ["repairing", "repaired", "delivered"] {
            server
                .post(&format!("/api/v1/repairs/{}/status", order["id"].as_str().unwrap()))
                .add_header("authorization", &auth)
                .json(&json!({ "status": status }))
                .await
                .assert_status_ok();
        }
    }

    // Shutdown drains the queue, so every email is on disk afterwards
    bg.shutdown().await;
    let written: Vec<String> = std::fs::read_dir(emails.path())
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    assert_eq!(written.len(), 2);
    assert!(written.iter().all(|email| email.contains("nora@example.com")));
}

#[sqlx::test]
#[test_log::test]
async fn malformed_numbers_do_not_block_numbering(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);
    let case = create_product(&server, &auth, "Case", "5.00", 100, 0).await;

    for _ in 0..22 {
        cash_sale(&server, &auth, &case["id"], 1).await.assert_status(StatusCode::CREATED);
    }
    // Leave V-000001 alone and turn the rest into longer, non-numeric numbers
    let mut tx = begin_scoped(&pool, owner.company_id).await.unwrap();
    sqlx::query("UPDATE sales SET sale_number = sale_number || '-LEGACY' WHERE company_id = $1 AND sale_number <> 'V-000001'")
        .bind(owner.company_id)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let response = cash_sale(&server, &auth, &case["id"], 1).await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["sale_number"], "V-000002");
}

#[sqlx::test]
#[test_log::test]
async fn cash_register_reconciles_cash_taken(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let auth = bearer_for(&config, &owner);
    let charger = create_product(&server, &auth, "Charger", "25.00", 10, 0).await;

    let current: Value = server
        .get("/api/v1/cash-register/current")
        .add_header("authorization", &auth)
        .await
        .json();
    assert!(current.is_null());

    server
        .post("/api/v1/cash-register/open")
        .add_header("authorization", &auth)
        .json(&json!({ "opening_amount": "100.00" }))
        .await
        .assert_status(StatusCode::CREATED);

    // Only one register may be open
    server
        .post("/api/v1/cash-register/open")
        .add_header("authorization", &auth)
        .json(&json!({ "opening_amount": "0" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    cash_sale(&server, &auth, &charger["id"], 2).await.assert_status(StatusCode::CREATED);

    let current: Value = server
        .get("/api/v1/cash-register/current")
        .add_header("authorization", &auth)
        .await
        .json();
    assert_eq!(dec(&current["expected_cash"]), Decimal::from(150));

    let response = server
        .post("/api/v1/cash-register/close")
        .add_header("authorization", &auth)
        .json(&json!({ "counted_cash": "150.00" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let closure: Value = response.json();
    assert_eq!(closure["reconciliation"]["status"], "balanced");
    assert!(dec(&closure["reconciliation"]["difference"]).is_zero());

    server
        .post("/api/v1/cash-register/close")
        .add_header("authorization", &auth)
        .json(&json!({ "counted_cash": "0" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[sqlx::test]
#[test_log::test]
async fn companies_cannot_see_each_other(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let first = create_test_company(&pool, "First").await;
    let second = create_test_company(&pool, "Second").await;
    let first_auth = bearer_for(&config, &first);
    let second_auth = bearer_for(&config, &second);

    let customer = create_customer(&server, &first_auth, "Private").await;
    let customer_id = customer["id"].as_str().unwrap();

    server
        .get(&format!("/api/v1/customers/{customer_id}"))
        .add_header("authorization", &second_auth)
        .await
        .assert_status_not_found();

    let listed: Value = server
        .get("/api/v1/customers")
        .add_header("authorization", &second_auth)
        .await
        .json();
    assert_eq!(listed["total_count"], 0);

    // Each tenant numbers its own documents
    let product: Value = create_product(&server, &second_auth, "Glass", "3.00", 5, 0).await;
    let first_product: Value = create_product(&server, &first_auth, "Glass", "3.00", 5, 0).await;
    let sale: Value = cash_sale(&server, &first_auth, &first_product["id"], 1).await.json();
    assert_eq!(sale["sale_number"], "V-000001");
    let sale: Value = cash_sale(&server, &second_auth, &product["id"], 1).await.json();
    assert_eq!(sale["sale_number"], "V-000001");

    // Another company's product cannot be sold
    cash_sale(&server, &second_auth, &first_product["id"], 1)
        .await
        .assert_status_not_found();
}

#[sqlx::test]
#[test_log::test]
async fn technicians_update_repairs_but_not_the_register(pool: PgPool) {
    let (server, _bg) = create_test_app(pool.clone()).await;
    let config = create_test_config();
    let owner = create_test_company(&pool, "Fixit").await;
    let technician: CurrentUser = create_test_profile(&pool, &owner, Role::Technician).await;
    let owner_auth = bearer_for(&config, &owner);
    let tech_auth = bearer_for(&config, &technician);

    let customer = create_customer(&server, &owner_auth, "Marta").await;
    let order = json!({ "customer_id": customer["id"], "device_type": "Tablet", "reported_issue": "Won't charge" });
    server
        .post("/api/v1/repairs")
        .add_header("authorization", &tech_auth)
        .json(&order)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let created: Value = server
        .post("/api/v1/repairs")
        .add_header("authorization", &owner_auth)
        .json(&order)
        .await
        .json();
    server
        .post(&format!("/api/v1/repairs/{}/status", created["id"].as_str().unwrap()))
        .add_header("authorization", &tech_auth)
        .json(&json!({ "status": "diagnosing", "note": "Checking the port" }))
        .await
        .assert_status_ok();

    server
        .post("/api/v1/cash-register/open")
        .add_header("authorization", &tech_auth)
        .json(&json!({ "opening_amount": "10.00" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[sqlx::test]
#[test_log::test]
async fn bootstrap_creates_the_first_company_once(pool: PgPool) {
    let mut config = create_test_config();
    config.bootstrap = Some(BootstrapConfig {
        company_name: "Main Street Repairs".to_string(),
        owner_email: "Owner@Example.com".to_string(),
        owner_name: Some("Sam".to_string()),
        owner_password: Some("correct horse battery".to_string()),
    });

    let created = bootstrap_company(&config, &pool).await.unwrap();
    assert!(created.is_some());
    assert!(bootstrap_company(&config, &pool).await.unwrap().is_none());

    let (server, _bg) = create_test_app(pool.clone()).await;
    let response = server
        .post("/authentication/login")
        .json(&json!({ "email": "owner@example.com", "password": "correct horse battery" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["company"]["name"], "Main Street Repairs");
    assert_eq!(body["profile"]["role"], "owner");
}
