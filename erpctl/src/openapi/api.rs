//! OpenAPI document for the management API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, cash, errors, inventory, repairs, totals};

/// Session token as a bearer header or as the session cookie set by login.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.security_schemes.insert(
            "BearerAuth".to_string(),
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "Session token returned by `/authentication/login`:\n\n\
                        ```\nAuthorization: Bearer SESSION_TOKEN\n```",
                    ))
                    .build(),
            ),
        );
        components.security_schemes.insert(
            "CookieAuth".to_string(),
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "erpctl_session",
                "Session cookie set by `/authentication/login` and `/authentication/register`.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::company::get_me,
        api::handlers::company::get_company,
        api::handlers::company::update_company,
        api::handlers::profiles::list_profiles,
        api::handlers::profiles::create_profile,
        api::handlers::profiles::update_profile,
        api::handlers::customers::list_customers,
        api::handlers::customers::create_customer,
        api::handlers::customers::get_customer,
        api::handlers::customers::update_customer,
        api::handlers::customers::delete_customer,
        api::handlers::suppliers::list_suppliers,
        api::handlers::suppliers::create_supplier,
        api::handlers::suppliers::get_supplier,
        api::handlers::suppliers::update_supplier,
        api::handlers::suppliers::delete_supplier,
        api::handlers::technicians::list_technicians,
        api::handlers::technicians::create_technician,
        api::handlers::technicians::get_technician,
        api::handlers::technicians::update_technician,
        api::handlers::technicians::delete_technician,
        api::handlers::categories::list_categories,
        api::handlers::categories::create_category,
        api::handlers::categories::update_category,
        api::handlers::categories::delete_category,
        api::handlers::products::list_products,
        api::handlers::products::create_product,
        api::handlers::products::get_product,
        api::handlers::products::update_product,
        api::handlers::products::delete_product,
        api::handlers::products::list_low_stock,
        api::handlers::products::list_movements,
        api::handlers::products::adjust_stock,
        api::handlers::products::list_variants,
        api::handlers::products::create_variant,
        api::handlers::products::delete_variant,
        api::handlers::repairs::list_repairs,
        api::handlers::repairs::create_repair,
        api::handlers::repairs::get_repair,
        api::handlers::repairs::update_repair,
        api::handlers::repairs::change_status,
        api::handlers::repairs::cancel_repair,
        api::handlers::repairs::add_item,
        api::handlers::repairs::delete_item,
        api::handlers::repairs::use_item,
        api::handlers::repairs::reverse_stock,
        api::handlers::repairs::list_payments,
        api::handlers::repairs::add_payment,
        api::handlers::repairs::list_notes,
        api::handlers::repairs::add_note,
        api::handlers::repairs::delete_note,
        api::handlers::sales::list_sales,
        api::handlers::sales::create_sale,
        api::handlers::sales::get_sale,
        api::handlers::sales::void_sale,
        api::handlers::quotes::list_quotes,
        api::handlers::quotes::create_quote,
        api::handlers::quotes::get_quote,
        api::handlers::quotes::change_quote_status,
        api::handlers::quotes::convert_quote,
        api::handlers::purchase_orders::list_purchase_orders,
        api::handlers::purchase_orders::create_purchase_order,
        api::handlers::purchase_orders::get_purchase_order,
        api::handlers::purchase_orders::mark_ordered,
        api::handlers::purchase_orders::receive_purchase_order,
        api::handlers::purchase_orders::cancel_purchase_order,
        api::handlers::cash_register::current_register,
        api::handlers::cash_register::open_register,
        api::handlers::cash_register::close_register,
        api::handlers::cash_register::list_closures,
        api::handlers::notes::list_notes,
        api::handlers::notes::create_note,
        api::handlers::notes::update_note,
        api::handlers::notes::delete_note,
        api::handlers::notifications::list_notifications,
        api::handlers::notifications::unread_count,
        api::handlers::notifications::mark_read,
        api::handlers::notifications::mark_all_read,
        api::handlers::reports::dashboard,
        api::handlers::reports::sales_summary,
        api::handlers::reports::liquidation,
        api::handlers::reports::liquidation_export,
        api::handlers::reports::sales_export,
        api::handlers::reports::repairs_export,
    ),
    components(
        schemas(
            api::models::companies::CompanyResponse,
            api::models::companies::CompanyUpdate,
            api::models::profiles::ProfileResponse,
            api::models::profiles::ProfileCreate,
            api::models::profiles::ProfileUpdate,
            api::models::profiles::Role,
            api::models::customers::CustomerCreate,
            api::models::customers::CustomerUpdate,
            api::models::customers::CustomerResponse,
            api::models::suppliers::SupplierCreate,
            api::models::suppliers::SupplierUpdate,
            api::models::suppliers::SupplierResponse,
            api::models::technicians::TechnicianCreate,
            api::models::technicians::TechnicianUpdate,
            api::models::technicians::TechnicianResponse,
            api::models::categories::CategoryCreate,
            api::models::categories::CategoryUpdate,
            api::models::categories::CategoryResponse,
            api::models::products::ProductCreate,
            api::models::products::ProductUpdate,
            api::models::products::ProductResponse,
            api::models::products::StockAdjustment,
            api::models::products::StockMovementResponse,
            api::models::products::VariantCreate,
            api::models::products::VariantResponse,
            api::models::repairs::RepairOrderCreate,
            api::models::repairs::RepairOrderUpdate,
            api::models::repairs::RepairOrderResponse,
            api::models::repairs::RepairOrderDetail,
            api::models::repairs::RepairItemCreate,
            api::models::repairs::RepairItemResponse,
            api::models::repairs::RepairPaymentCreate,
            api::models::repairs::RepairPaymentResponse,
            api::models::repairs::RepairPaymentReceipt,
            api::models::repairs::RepairNoteCreate,
            api::models::repairs::RepairNoteResponse,
            api::models::repairs::StatusChangeRequest,
            api::models::repairs::StockReversalResponse,
            api::models::sales::SaleCreate,
            api::models::sales::SaleItemCreate,
            api::models::sales::SaleResponse,
            api::models::sales::SaleItemResponse,
            api::models::sales::SaleDetail,
            api::models::sales::SaleStatus,
            api::models::sales::VoidSaleRequest,
            api::models::quotes::QuoteCreate,
            api::models::quotes::QuoteItemCreate,
            api::models::quotes::QuoteResponse,
            api::models::quotes::QuoteItemResponse,
            api::models::quotes::QuoteDetail,
            api::models::quotes::QuoteStatus,
            api::models::quotes::QuoteStatusRequest,
            api::models::quotes::ConvertQuoteRequest,
            api::models::purchase_orders::PurchaseOrderCreate,
            api::models::purchase_orders::PurchaseOrderItemCreate,
            api::models::purchase_orders::PurchaseOrderResponse,
            api::models::purchase_orders::PurchaseOrderItemResponse,
            api::models::purchase_orders::PurchaseOrderDetail,
            api::models::purchase_orders::PurchaseOrderStatus,
            api::models::cash_register::CashOpenRequest,
            api::models::cash_register::CashCloseRequest,
            api::models::cash_register::CashOpeningResponse,
            api::models::cash_register::CashClosureResponse,
            api::models::cash_register::CurrentRegisterResponse,
            api::models::notes::InternalNoteCreate,
            api::models::notes::InternalNoteUpdate,
            api::models::notes::InternalNoteResponse,
            api::models::notifications::NotificationResponse,
            api::models::notifications::NotificationKind,
            api::models::notifications::UnreadCountResponse,
            api::models::notifications::MarkAllReadResponse,
            api::models::reports::DashboardResponse,
            api::models::reports::SalesSummaryResponse,
            api::models::reports::SalesTotals,
            api::models::reports::MethodTotal,
            api::models::reports::DailyTotal,
            api::models::reports::TopProduct,
            api::models::reports::StatusCount,
            cash::PaymentMethod,
            cash::CashTotals,
            cash::Reconciliation,
            cash::ReconciliationStatus,
            inventory::MovementReason,
            inventory::LiquidationReport,
            inventory::LiquidationLine,
            inventory::CategorySubtotal,
            inventory::LiquidationTotals,
            repairs::RepairStatus,
            repairs::PaymentStatus,
            repairs::PaymentSummary,
            repairs::CostBreakdown,
            totals::DocumentTotals,
            errors::ErrorBody,
        )
    ),
    tags(
        (name = "company", description = "The caller's company and profile."),
        (name = "profiles", description = "Staff accounts. Roles are `owner`, `admin`, `staff` and `technician`."),
        (name = "customers", description = "Customer records. Deleting a customer hides it; history is kept."),
        (name = "suppliers", description = "Suppliers used on purchase orders."),
        (name = "technicians", description = "Technicians assignable to repair orders."),
        (name = "categories", description = "Product categories."),
        (name = "products", description = "Catalog, stock levels, adjustments and the movement ledger."),
        (name = "repairs", description = "Repair intake and workflow.

Orders usually move `received → diagnosing → waiting_parts → repairing → repaired → delivered`, but any open order may jump to any other status. `delivered` and `cancelled` are final. Parts are deducted from stock when an item is marked used; after cancelling, `reverse-stock` returns used parts to stock."),
        (name = "sales", description = "Point-of-sale transactions. Completing a sale deducts stock; voiding it restores stock."),
        (name = "quotes", description = "Quotes for customers. An accepted quote converts into a sale."),
        (name = "purchase-orders", description = "Orders to suppliers. Receiving an order adds stock and updates cost prices."),
        (name = "cash-register", description = "Shift open and close with cash reconciliation."),
        (name = "notes", description = "Staff notice board."),
        (name = "notifications", description = "In-app notifications."),
        (name = "reports", description = "Dashboard, sales summary, inventory liquidation and CSV exports."),
    ),
)]
struct V1ApiDoc;

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::logout,
    ),
    components(
        schemas(
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
        )
    ),
    nest(
        (path = "/api/v1", api = V1ApiDoc)
    ),
    tags(
        (name = "authentication", description = "Registration, login and logout. Login sets the session cookie and also returns the token for `Authorization: Bearer` use."),
    ),
    info(
        title = "erpctl API",
        version = "1.0.0",
        description = "Back office for repair shops: repair orders, point of sale, quotes, purchasing, inventory and the cash register.

## Authentication

Every `/api/v1` endpoint needs a session, either the cookie set at login or the token in the `Authorization` header:

```
Authorization: Bearer SESSION_TOKEN
```

## Errors

Errors are returned as JSON with a single message:

```json
{ \"error\": \"Insufficient stock for 'iPhone 12 screen': 1 available, 2 requested\" }
```

## Money

Amounts are decimal strings with two places, for example `\"149.90\"`.",
    ),
)]
pub struct ErpApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_paths_are_nested() {
        let doc = ErpApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/repairs/{id}/status"));
        assert!(doc.paths.paths.contains_key("/api/v1/reports/liquidation.csv"));
        assert!(doc.paths.paths.contains_key("/authentication/login"));
    }

    #[test]
    fn list_filters_are_documented() {
        let doc = serde_json::to_value(ErpApiDoc::openapi()).unwrap();
        let names = |path: &str| -> Vec<String> {
            doc["paths"][path]["get"]["parameters"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["name"].as_str().unwrap().to_string())
                .collect()
        };

        let repairs = names("/api/v1/repairs");
        assert!(repairs.contains(&"customer_id".to_string()));
        assert!(repairs.contains(&"technician_id".to_string()));
        assert!(names("/api/v1/products").contains(&"category_id".to_string()));
        assert!(names("/api/v1/purchase-orders").contains(&"supplier_id".to_string()));
    }

    #[test]
    fn both_session_schemes_are_declared() {
        let doc = ErpApiDoc::openapi();
        let schemes = &doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("BearerAuth"));
        assert!(schemes.contains_key("CookieAuth"));
    }
}
