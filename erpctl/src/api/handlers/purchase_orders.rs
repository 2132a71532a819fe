//! Purchase orders: draft, order from the supplier, receive into stock.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use super::products::apply_stock_change;
use crate::{
    AppState,
    api::models::{
        notifications::NotificationKind,
        pagination::PaginatedResponse,
        profiles::CurrentUser,
        purchase_orders::{
            ListPurchaseOrdersQuery, PurchaseOrderCreate, PurchaseOrderDetail, PurchaseOrderItemResponse, PurchaseOrderResponse,
            PurchaseOrderStatus,
        },
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Notifications, Products, PurchaseOrders, Repository, Suppliers, purchase_orders::PurchaseOrderFilter},
        models::{
            notifications::NotificationCreateDBRequest,
            products::StockChange,
            purchase_orders::{
                PurchaseOrderCreateDBRequest, PurchaseOrderDBResponse, PurchaseOrderItemCreateDBRequest, PurchaseOrderItemDBResponse,
            },
        },
    },
    errors::{Error, Result},
    inventory::{MovementReason, merge_quantities},
    sequences::{DocumentKind, SequenceSettings, insert_numbered},
    totals::{DocumentTotals, LineInput, line_total, round_money},
    types::{CompanyId, Operation, PurchaseOrderId, Resource},
};

fn detail(order: PurchaseOrderDBResponse, items: Vec<PurchaseOrderItemDBResponse>) -> PurchaseOrderDetail {
    PurchaseOrderDetail {
        order: PurchaseOrderResponse::from(order),
        items: items.into_iter().map(PurchaseOrderItemResponse::from).collect(),
    }
}

/// Move a locked order to `to`, failing if it is not in one of the allowed source statuses.
async fn transition(
    conn: &mut PgConnection,
    company_id: CompanyId,
    id: PurchaseOrderId,
    to: PurchaseOrderStatus,
) -> Result<PurchaseOrderDBResponse> {
    let mut repo = PurchaseOrders::new(conn, company_id);
    let current = repo
        .get_for_update(id)
        .await?
        .ok_or_else(|| Error::not_found("Purchase order", id))?;
    current.status.check_transition(to)?;
    repo.transition(id, to).await?.ok_or_else(|| Error::Conflict {
        message: format!("Purchase order {} changed status concurrently, please reload", current.order_number),
    })
}

#[utoipa::path(
    get,
    path = "/purchase-orders",
    tag = "purchase-orders",
    summary = "List purchase orders",
    params(ListPurchaseOrdersQuery),
    responses((status = 200, description = "Purchase orders, newest first", body = PaginatedResponse<PurchaseOrderResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(query): Query<ListPurchaseOrdersQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<PurchaseOrderResponse>>> {
    permissions::require(&user, Resource::PurchaseOrders, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = PurchaseOrderFilter {
        status: query.status,
        supplier_id: query.supplier_id,
        ..PurchaseOrderFilter::new(skip, limit).with_search(query.search)
    };

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = PurchaseOrders::new(&mut tx, user.company_id);
    let orders = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = orders.into_iter().map(PurchaseOrderResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/purchase-orders",
    tag = "purchase-orders",
    summary = "Draft a purchase order",
    request_body = PurchaseOrderCreate,
    responses(
        (status = 201, description = "Purchase order created as draft", body = PurchaseOrderDetail),
        (status = 400, description = "Invalid items"),
        (status = 404, description = "Supplier or product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<PurchaseOrderCreate>,
) -> Result<(StatusCode, Json<PurchaseOrderDetail>)> {
    permissions::require(&user, Resource::PurchaseOrders, Operation::Create)?;
    create.validate()?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    match Suppliers::new(&mut tx, company_id).get_by_id(create.supplier_id).await? {
        Some(supplier) if supplier.deleted_at.is_none() => {}
        _ => return Err(Error::not_found("Supplier", create.supplier_id)),
    }

    let ids: Vec<_> = create.items.iter().map(|item| item.product_id).collect();
    let products = Products::new(&mut tx, company_id).get_bulk(ids).await?;
    let mut items = Vec::with_capacity(create.items.len());
    for item in &create.items {
        if !products.get(&item.product_id).is_some_and(|p| p.deleted_at.is_none()) {
            return Err(Error::not_found("Product", item.product_id));
        }
        let unit_cost = round_money(item.unit_cost);
        items.push(PurchaseOrderItemCreateDBRequest {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_cost,
            line_total: line_total(item.quantity, unit_cost)?,
        });
    }

    let lines: Vec<LineInput> = create
        .items
        .iter()
        .map(|item| LineInput {
            quantity: item.quantity,
            unit_price: item.unit_cost,
        })
        .collect();
    let totals = DocumentTotals::compute(&lines, Decimal::ZERO, create.tax_rate.unwrap_or_default())?;

    let request = PurchaseOrderCreateDBRequest {
        supplier_id: create.supplier_id,
        expected_date: create.expected_date,
        totals,
        notes: create.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        created_by: Some(user.id),
    };
    let settings = SequenceSettings::from(&state.config.sequences);
    let order = insert_numbered(&mut tx, DocumentKind::PurchaseOrder, company_id, &settings, |conn, number| {
        let request = request.clone();
        Box::pin(async move { PurchaseOrders::new(conn, company_id).create(&request, &number).await })
    })
    .await?;
    let items = PurchaseOrders::new(&mut tx, company_id).add_items(order.id, &items).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(detail(order, items))))
}

#[utoipa::path(
    get,
    path = "/purchase-orders/{id}",
    tag = "purchase-orders",
    summary = "Get purchase order",
    params(("id" = uuid::Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order with its lines", body = PurchaseOrderDetail),
        (status = 404, description = "Purchase order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<PurchaseOrderId>,
    user: CurrentUser,
) -> Result<Json<PurchaseOrderDetail>> {
    permissions::require(&user, Resource::PurchaseOrders, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = PurchaseOrders::new(&mut tx, user.company_id);
    let order = repo.get(id).await?.ok_or_else(|| Error::not_found("Purchase order", id))?;
    let items = repo.list_items(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(detail(order, items)))
}

#[utoipa::path(
    post,
    path = "/purchase-orders/{id}/order",
    tag = "purchase-orders",
    summary = "Mark as sent to the supplier",
    params(("id" = uuid::Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order marked ordered", body = PurchaseOrderResponse),
        (status = 400, description = "Order is not a draft"),
        (status = 404, description = "Purchase order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn mark_ordered(
    State(state): State<AppState>,
    Path(id): Path<PurchaseOrderId>,
    user: CurrentUser,
) -> Result<Json<PurchaseOrderResponse>> {
    permissions::require(&user, Resource::PurchaseOrders, Operation::Update)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let order = transition(&mut tx, user.company_id, id, PurchaseOrderStatus::Ordered).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(PurchaseOrderResponse::from(order)))
}

/// Receive the goods: stock goes up by every line and each product's cost price becomes the
/// cost on this order.
#[utoipa::path(
    post,
    path = "/purchase-orders/{id}/receive",
    tag = "purchase-orders",
    summary = "Receive into stock",
    params(("id" = uuid::Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order received and stock added", body = PurchaseOrderDetail),
        (status = 400, description = "Order already received or cancelled"),
        (status = 404, description = "Purchase order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<PurchaseOrderId>,
    user: CurrentUser,
) -> Result<Json<PurchaseOrderDetail>> {
    permissions::require(&user, Resource::PurchaseOrders, Operation::Update)?;
    permissions::require(&user, Resource::Inventory, Operation::Update)?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    let order = transition(&mut tx, company_id, id, PurchaseOrderStatus::Received).await?;
    let items = PurchaseOrders::new(&mut tx, company_id).list_items(id).await?;

    let received = merge_quantities(items.iter().map(|item| (item.product_id, item.quantity)))?;
    // Later lines win when a product appears twice
    let mut costs = BTreeMap::new();
    for item in &items {
        costs.insert(item.product_id, item.unit_cost);
    }
    for (product_id, unit_cost) in costs {
        Products::new(&mut tx, company_id).set_cost_price(product_id, unit_cost).await?;
    }
    for (product_id, quantity) in received {
        let change = StockChange::new(product_id, quantity, MovementReason::Purchase)
            .reference(id)
            .note(Some(format!("Received {}", order.order_number)))
            .actor(user.id);
        apply_stock_change(&mut tx, company_id, false, change).await?;
    }

    if state.config.notifications.in_app {
        let units: i64 = items.iter().map(|item| i64::from(item.quantity)).sum();
        Notifications::new(&mut tx, company_id)
            .create(
                &NotificationCreateDBRequest::company_wide(
                    NotificationKind::PurchaseReceived,
                    format!("{} received", order.order_number),
                    format!("{units} units from {} added to stock", order.supplier_name),
                )
                .about(order.id),
            )
            .await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(order_number = %order.order_number, lines = items.len(), "Received purchase order");
    Ok(Json(detail(order, items)))
}

#[utoipa::path(
    post,
    path = "/purchase-orders/{id}/cancel",
    tag = "purchase-orders",
    summary = "Cancel purchase order",
    params(("id" = uuid::Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order cancelled", body = PurchaseOrderResponse),
        (status = 400, description = "Order already received or cancelled"),
        (status = 404, description = "Purchase order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<PurchaseOrderId>,
    user: CurrentUser,
) -> Result<Json<PurchaseOrderResponse>> {
    permissions::require(&user, Resource::PurchaseOrders, Operation::Update)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let order = transition(&mut tx, user.company_id, id, PurchaseOrderStatus::Cancelled).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(PurchaseOrderResponse::from(order)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::profiles::Role;
    use crate::test_utils::{bearer, create_test_config, create_test_server};
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn staff_can_read_but_not_draft() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Staff);
        let server = create_test_server(config);

        let response = server
            .post("/api/v1/purchase-orders")
            .add_header("authorization", auth)
            .json(&json!({ "supplier_id": Uuid::new_v4(), "items": [] }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn empty_orders_are_rejected() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Admin);
        let server = create_test_server(config);

        let response = server
            .post("/api/v1/purchase-orders")
            .add_header("authorization", auth)
            .json(&json!({ "supplier_id": Uuid::new_v4(), "items": [] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<serde_json::Value>()["error"],
            "A purchase order needs at least one item"
        );
    }
}
