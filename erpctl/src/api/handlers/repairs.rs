//! Repair orders: intake, status workflow, parts, payments and notes.
//!
//! Every mutation locks the order row (`SELECT ... FOR UPDATE`) before reading the state it
//! validates against, so two requests cannot both use the same part or both take the last
//! payment that fits the balance.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgConnection;

use super::{products::apply_stock_change, sales::ensure_customer};
use crate::{
    AppState,
    api::models::{
        notifications::NotificationKind,
        pagination::PaginatedResponse,
        profiles::CurrentUser,
        repairs::{
            ListRepairsQuery, RepairItemCreate, RepairItemResponse, RepairNoteCreate, RepairNoteResponse, RepairOrderCreate,
            RepairOrderDetail, RepairOrderResponse, RepairOrderUpdate, RepairPaymentCreate, RepairPaymentReceipt,
            RepairPaymentResponse, StatusChangeRequest, StockReversalResponse,
        },
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Companies, Notifications, Products, RepairOrders, Repository, Technicians, repair_orders::RepairOrderFilter},
        models::{
            notifications::NotificationCreateDBRequest,
            products::StockChange,
            repairs::{
                RepairItemCreateDBRequest, RepairOrderCreateDBRequest, RepairOrderDBResponse, RepairOrderUpdateDBRequest,
                RepairPaymentCreateDBRequest,
            },
        },
    },
    email::RepairStatusEmail,
    errors::{Error, Result},
    inventory::{MovementReason, merge_quantities},
    notifications::NotificationEvent,
    repairs::{PaymentSummary, RepairStatus, cost_breakdown, plan_transition, validate_payment},
    sequences::{DocumentKind, SequenceSettings, insert_numbered},
    totals::round_money,
    types::{CompanyId, Operation, RepairItemId, RepairOrderId, Resource, TechnicianId},
};

async fn lock_order(conn: &mut PgConnection, company_id: CompanyId, id: RepairOrderId) -> Result<RepairOrderDBResponse> {
    RepairOrders::new(conn, company_id)
        .get_for_update(id)
        .await?
        .ok_or_else(|| Error::not_found("Repair order", id))
}

fn ensure_open(order: &RepairOrderDBResponse) -> Result<()> {
    if order.status.is_closed() {
        return Err(Error::bad_request(format!(
            "Repair order {} is {} and can no longer be changed",
            order.order_number, order.status
        )));
    }
    Ok(())
}

async fn ensure_technician(conn: &mut PgConnection, company_id: CompanyId, id: Option<TechnicianId>) -> Result<()> {
    let Some(id) = id else { return Ok(()) };
    match Technicians::new(conn, company_id).get_by_id(id).await? {
        Some(technician) if technician.active => Ok(()),
        Some(technician) => Err(Error::bad_request(format!("Technician {} is inactive", technician.name))),
        None => Err(Error::not_found("Technician", id)),
    }
}

/// Recompute parts and total from the current lines and labor.
async fn refresh_costs(conn: &mut PgConnection, company_id: CompanyId, order: &RepairOrderDBResponse) -> Result<()> {
    let mut repo = RepairOrders::new(conn, company_id);
    let lines: Vec<_> = repo.list_items(order.id).await?.iter().map(|item| item.line()).collect();
    let costs = cost_breakdown(order.labor_cost, &lines)?;
    repo.set_costs(order.id, &costs).await?;
    Ok(())
}

async fn payment_summary(conn: &mut PgConnection, company_id: CompanyId, order: &RepairOrderDBResponse) -> Result<PaymentSummary> {
    let payments = RepairOrders::new(conn, company_id).list_payments(order.id).await?;
    Ok(PaymentSummary::compute(order.total_cost, payments.iter().map(|p| p.amount)))
}

async fn load_detail(conn: &mut PgConnection, company_id: CompanyId, id: RepairOrderId) -> Result<RepairOrderDetail> {
    let mut repo = RepairOrders::new(conn, company_id);
    let order = repo.get(id).await?.ok_or_else(|| Error::not_found("Repair order", id))?;
    let items = repo.list_items(id).await?;
    let payments = repo.list_payments(id).await?;
    let payment = PaymentSummary::compute(order.total_cost, payments.iter().map(|p| p.amount));

    Ok(RepairOrderDetail {
        order: RepairOrderResponse::from(order),
        items: items.into_iter().map(RepairItemResponse::from).collect(),
        payments: payments.into_iter().map(RepairPaymentResponse::from).collect(),
        payment,
    })
}

#[utoipa::path(
    get,
    path = "/repairs",
    tag = "repairs",
    summary = "List repair orders",
    params(ListRepairsQuery),
    responses(
        (status = 200, description = "Repair orders, newest first", body = PaginatedResponse<RepairOrderResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_repairs(
    State(state): State<AppState>,
    Query(query): Query<ListRepairsQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<RepairOrderResponse>>> {
    permissions::require(&user, Resource::Repairs, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = RepairOrderFilter {
        status: query.status,
        active_only: query.active_only,
        customer_id: query.customer_id,
        technician_id: query.technician_id,
        ..RepairOrderFilter::new(skip, limit).with_search(query.search)
    };

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = RepairOrders::new(&mut tx, user.company_id);
    let orders = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = orders.into_iter().map(RepairOrderResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/repairs",
    tag = "repairs",
    summary = "Receive a device for repair",
    request_body = RepairOrderCreate,
    responses(
        (status = 201, description = "Repair order created with the next order number", body = RepairOrderResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Customer or technician not found"),
        (status = 409, description = "Order number could not be allocated"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_repair(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<RepairOrderCreate>,
) -> Result<(StatusCode, Json<RepairOrderResponse>)> {
    permissions::require(&user, Resource::Repairs, Operation::Create)?;
    create.validate()?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    ensure_customer(&mut tx, company_id, Some(create.customer_id)).await?;
    ensure_technician(&mut tx, company_id, create.technician_id).await?;

    let request = RepairOrderCreateDBRequest::new(create, user.id);
    let settings = SequenceSettings::from(&state.config.sequences);
    let order = insert_numbered(&mut tx, DocumentKind::RepairOrder, company_id, &settings, |conn, number| {
        let request = request.clone();
        Box::pin(async move { RepairOrders::new(conn, company_id).create(&request, &number).await })
    })
    .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(order_number = %order.order_number, "Repair order received");
    Ok((StatusCode::CREATED, Json(RepairOrderResponse::from(order))))
}

#[utoipa::path(
    get,
    path = "/repairs/{id}",
    tag = "repairs",
    summary = "Get repair order",
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 200, description = "Order with items, payments and balance", body = RepairOrderDetail),
        (status = 404, description = "Repair order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_repair(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
) -> Result<Json<RepairOrderDetail>> {
    permissions::require(&user, Resource::Repairs, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let detail = load_detail(&mut tx, user.company_id, id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/repairs/{id}",
    tag = "repairs",
    summary = "Update repair order details",
    request_body = RepairOrderUpdate,
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 200, description = "Order updated", body = RepairOrderDetail),
        (status = 400, description = "Invalid request or order closed"),
        (status = 404, description = "Repair order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn update_repair(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
    Json(update): Json<RepairOrderUpdate>,
) -> Result<Json<RepairOrderDetail>> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;
    update.validate()?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    ensure_open(&lock_order(&mut tx, company_id, id).await?)?;
    ensure_technician(&mut tx, company_id, update.technician_id).await?;

    let order = RepairOrders::new(&mut tx, company_id)
        .update(id, &RepairOrderUpdateDBRequest::from(update))
        .await?;
    refresh_costs(&mut tx, company_id, &order).await?;
    let detail = load_detail(&mut tx, company_id, id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(detail))
}

/// Apply a status change, then queue the customer email once the change is committed.
async fn transition(state: &AppState, user: &CurrentUser, id: RepairOrderId, to: RepairStatus, note: Option<String>) -> Result<RepairOrderDetail> {
    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;

    let current = lock_order(&mut tx, company_id, id).await?;
    let plan = plan_transition(current.status, to)?;
    let order = RepairOrders::new(&mut tx, company_id)
        .apply_transition(id, &plan)
        .await?
        .ok_or_else(|| Error::Conflict {
            message: format!("Repair order {} changed status concurrently, please reload", current.order_number),
        })?;

    if let Some(note) = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        RepairOrders::new(&mut tx, company_id)
            .add_note(id, user.id, &format!("{} → {}: {note}", plan.from.label(), plan.to.label()), true)
            .await?;
    }

    if state.config.notifications.in_app {
        Notifications::new(&mut tx, company_id)
            .create(
                &NotificationCreateDBRequest::company_wide(
                    NotificationKind::RepairStatus,
                    format!("{} is now {}", order.order_number, plan.to.label()),
                    format!("{} for {}", order.device_label(), order.customer_name),
                )
                .about(order.id),
            )
            .await?;
    }

    let email = match (&order.customer_email, plan.notify_customer) {
        (Some(to_email), true) => {
            let company = Companies::new(&mut tx)
                .get(company_id)
                .await?
                .ok_or_else(|| Error::not_found("Company", company_id))?;
            let summary = payment_summary(&mut tx, company_id, &order).await?;
            Some(RepairStatusEmail {
                to_email: to_email.clone(),
                customer_name: order.customer_name.clone(),
                company_name: company.name,
                order_number: order.order_number.clone(),
                status: plan.to,
                device: order.device_label(),
                total: summary.total,
                balance: summary.balance,
                currency: company.currency,
            })
        }
        _ => None,
    };

    let detail = load_detail(&mut tx, company_id, id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    if let Some(email) = email {
        state.notifier.notify(NotificationEvent::RepairStatusChanged(email));
    }
    Ok(detail)
}

#[utoipa::path(
    post,
    path = "/repairs/{id}/status",
    tag = "repairs",
    summary = "Change repair status",
    request_body = StatusChangeRequest,
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 200, description = "Status changed", body = RepairOrderDetail),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Repair order not found"),
        (status = 409, description = "Status changed concurrently"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id, to = %request.status))]
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<RepairOrderDetail>> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;
    Ok(Json(transition(&state, &user, id, request.status, request.note).await?))
}

/// Cancel the order. Parts already used stay deducted until `reverse-stock` is called.
#[utoipa::path(
    post,
    path = "/repairs/{id}/cancel",
    tag = "repairs",
    summary = "Cancel repair order",
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = RepairOrderDetail),
        (status = 400, description = "Order already closed"),
        (status = 404, description = "Repair order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn cancel_repair(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
) -> Result<Json<RepairOrderDetail>> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;
    Ok(Json(transition(&state, &user, id, RepairStatus::Cancelled, None).await?))
}

#[utoipa::path(
    post,
    path = "/repairs/{id}/items",
    tag = "repairs",
    summary = "Add a part or service line",
    request_body = RepairItemCreate,
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 201, description = "Item added; order totals recomputed", body = RepairItemResponse),
        (status = 400, description = "Invalid item or order closed"),
        (status = 404, description = "Order or product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
    Json(create): Json<RepairItemCreate>,
) -> Result<(StatusCode, Json<RepairItemResponse>)> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;
    create.validate()?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    let order = lock_order(&mut tx, company_id, id).await?;
    ensure_open(&order)?;

    let request = match create.product_id {
        Some(product_id) => {
            let product = Products::new(&mut tx, company_id)
                .get_by_id(product_id)
                .await?
                .ok_or_else(|| Error::not_found("Product", product_id))?;
            RepairItemCreateDBRequest {
                product_id: Some(product_id),
                description: create
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .unwrap_or(product.name),
                quantity: create.quantity,
                unit_price: round_money(create.unit_price.unwrap_or(product.sale_price)),
            }
        }
        None => RepairItemCreateDBRequest {
            product_id: None,
            description: create.description.unwrap_or_default().trim().to_string(),
            quantity: create.quantity,
            unit_price: round_money(create.unit_price.unwrap_or_default()),
        },
    };

    let item = RepairOrders::new(&mut tx, company_id).add_item(id, &request).await?;
    refresh_costs(&mut tx, company_id, &order).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(RepairItemResponse::from(item))))
}

#[utoipa::path(
    delete,
    path = "/repairs/{id}/items/{item_id}",
    tag = "repairs",
    summary = "Remove an unused line",
    params(
        ("id" = uuid::Uuid, Path, description = "Repair order ID"),
        ("item_id" = uuid::Uuid, Path, description = "Item ID"),
    ),
    responses(
        (status = 204, description = "Item removed; order totals recomputed"),
        (status = 400, description = "Item already used or order closed"),
        (status = 404, description = "Item not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id, item_id = %item_id))]
pub async fn delete_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(RepairOrderId, RepairItemId)>,
    user: CurrentUser,
) -> Result<StatusCode> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    let order = lock_order(&mut tx, company_id, id).await?;
    ensure_open(&order)?;

    let mut repo = RepairOrders::new(&mut tx, company_id);
    if !repo.delete_unused_item(id, item_id).await? {
        return Err(match repo.get_item(id, item_id).await? {
            Some(_) => Error::bad_request("Item has already been used and cannot be removed"),
            None => Error::not_found("Repair item", item_id),
        });
    }
    refresh_costs(&mut tx, company_id, &order).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Deduct the item's product from stock and flag it as used.
#[utoipa::path(
    post,
    path = "/repairs/{id}/items/{item_id}/use",
    tag = "repairs",
    summary = "Use a part",
    params(
        ("id" = uuid::Uuid, Path, description = "Repair order ID"),
        ("item_id" = uuid::Uuid, Path, description = "Item ID"),
    ),
    responses(
        (status = 200, description = "Item marked used; stock deducted", body = RepairItemResponse),
        (status = 400, description = "Not a product line, already used, insufficient stock, or order closed"),
        (status = 404, description = "Item not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id, item_id = %item_id))]
pub async fn use_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(RepairOrderId, RepairItemId)>,
    user: CurrentUser,
) -> Result<Json<RepairItemResponse>> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    ensure_open(&lock_order(&mut tx, company_id, id).await?)?;

    let mut repo = RepairOrders::new(&mut tx, company_id);
    let item = repo
        .get_item(id, item_id)
        .await?
        .ok_or_else(|| Error::not_found("Repair item", item_id))?;
    let Some(product_id) = item.product_id else {
        return Err(Error::bad_request("Item does not reference a product"));
    };
    if item.used {
        return Err(Error::bad_request("Item has already been used"));
    }
    let used = repo.mark_item_used(id, item_id).await?.ok_or_else(|| Error::Conflict {
        message: "Item was used concurrently, please reload".to_string(),
    })?;

    let change = StockChange::new(product_id, -used.quantity, MovementReason::RepairUsage)
        .reference(id)
        .actor(user.id);
    apply_stock_change(&mut tx, company_id, state.config.notifications.in_app, change).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(RepairItemResponse::from(used)))
}

/// Return every used part of a cancelled order to stock.
#[utoipa::path(
    post,
    path = "/repairs/{id}/reverse-stock",
    tag = "repairs",
    summary = "Restore stock for a cancelled order",
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 200, description = "Items restored (empty when nothing was used)", body = StockReversalResponse),
        (status = 400, description = "Order is not cancelled"),
        (status = 404, description = "Repair order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn reverse_stock(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
) -> Result<Json<StockReversalResponse>> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    let order = lock_order(&mut tx, company_id, id).await?;
    if order.status != RepairStatus::Cancelled {
        return Err(Error::bad_request(format!(
            "Stock can only be reversed on cancelled orders; {} is {}",
            order.order_number, order.status
        )));
    }

    let released = RepairOrders::new(&mut tx, company_id).release_used_items(id).await?;
    let restores = merge_quantities(
        released
            .iter()
            .filter_map(|item| item.product_id.map(|product_id| (product_id, item.quantity))),
    )?;
    for (product_id, quantity) in restores {
        let change = StockChange::new(product_id, quantity, MovementReason::RepairReversal)
            .reference(id)
            .actor(user.id);
        apply_stock_change(&mut tx, company_id, false, change).await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(order_number = %order.order_number, restored = released.len(), "Reversed repair stock");
    Ok(Json(StockReversalResponse {
        restored: released.into_iter().map(RepairItemResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/repairs/{id}/payments",
    tag = "repairs",
    summary = "List payments",
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses((status = 200, description = "Payments, oldest first", body = Vec<RepairPaymentResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
) -> Result<Json<Vec<RepairPaymentResponse>>> {
    permissions::require(&user, Resource::RepairPayments, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let payments = RepairOrders::new(&mut tx, user.company_id).list_payments(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(payments.into_iter().map(RepairPaymentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/repairs/{id}/payments",
    tag = "repairs",
    summary = "Record a payment",
    request_body = RepairPaymentCreate,
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 201, description = "Payment recorded", body = RepairPaymentReceipt),
        (status = 400, description = "Non-positive amount, overpayment, or cancelled order"),
        (status = 404, description = "Repair order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn add_payment(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
    Json(create): Json<RepairPaymentCreate>,
) -> Result<(StatusCode, Json<RepairPaymentReceipt>)> {
    permissions::require(&user, Resource::RepairPayments, Operation::Create)?;
    let amount = create.amount;

    let company_id = user.company_id;
    let mut tx = begin_scoped(&state.db, company_id).await?;
    let order = lock_order(&mut tx, company_id, id).await?;
    if order.status == RepairStatus::Cancelled {
        return Err(Error::bad_request("Cannot take payments on a cancelled order"));
    }

    let before = payment_summary(&mut tx, company_id, &order).await?;
    validate_payment(amount, &before)?;

    let payment = RepairOrders::new(&mut tx, company_id)
        .add_payment(
            id,
            &RepairPaymentCreateDBRequest {
                amount,
                method: create.method,
                reference: create.reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
                received_by: Some(user.id),
            },
        )
        .await?;
    let summary = payment_summary(&mut tx, company_id, &order).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(RepairPaymentReceipt {
            payment: RepairPaymentResponse::from(payment),
            summary,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/repairs/{id}/notes",
    tag = "repairs",
    summary = "List notes",
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses((status = 200, description = "Notes, oldest first", body = Vec<RepairNoteResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_notes(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
) -> Result<Json<Vec<RepairNoteResponse>>> {
    permissions::require(&user, Resource::Repairs, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let notes = RepairOrders::new(&mut tx, user.company_id).list_notes(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(notes.into_iter().map(RepairNoteResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/repairs/{id}/notes",
    tag = "repairs",
    summary = "Add a note",
    request_body = RepairNoteCreate,
    params(("id" = uuid::Uuid, Path, description = "Repair order ID")),
    responses(
        (status = 201, description = "Note added", body = RepairNoteResponse),
        (status = 404, description = "Repair order not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn add_note(
    State(state): State<AppState>,
    Path(id): Path<RepairOrderId>,
    user: CurrentUser,
    Json(create): Json<RepairNoteCreate>,
) -> Result<(StatusCode, Json<RepairNoteResponse>)> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = RepairOrders::new(&mut tx, user.company_id);
    repo.get(id).await?.ok_or_else(|| Error::not_found("Repair order", id))?;
    let note = repo
        .add_note(id, user.id, create.body.trim(), create.is_internal.unwrap_or(true))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(RepairNoteResponse::from(note))))
}

#[utoipa::path(
    delete,
    path = "/repairs/{id}/notes/{note_id}",
    tag = "repairs",
    summary = "Delete a note",
    params(
        ("id" = uuid::Uuid, Path, description = "Repair order ID"),
        ("note_id" = uuid::Uuid, Path, description = "Note ID"),
    ),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 404, description = "Note not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(RepairOrderId, uuid::Uuid)>,
    user: CurrentUser,
) -> Result<StatusCode> {
    permissions::require(&user, Resource::Repairs, Operation::Update)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    if !RepairOrders::new(&mut tx, user.company_id).delete_note(id, note_id).await? {
        return Err(Error::not_found("Note", note_id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::profiles::Role;
    use crate::test_utils::{bearer, create_test_config, create_test_server};
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn requires_authentication() {
        let server = create_test_server(create_test_config());
        server.get("/api/v1/repairs").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn technicians_cannot_take_payments() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Technician);
        let server = create_test_server(config);

        let response = server
            .post(&format!("/api/v1/repairs/{}/payments", Uuid::new_v4()))
            .add_header("authorization", auth)
            .json(&json!({ "amount": "10.00", "method": "cash" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rejects_invalid_intake_before_touching_db() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Staff);
        let server = create_test_server(config);

        let response = server
            .post("/api/v1/repairs")
            .add_header("authorization", auth)
            .json(&json!({
                "customer_id": Uuid::new_v4(),
                "device_type": "Phone",
                "reported_issue": "   "
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["error"], "Reported issue is required");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Staff);
        let server = create_test_server(config);

        let response = server
            .post(&format!("/api/v1/repairs/{}/status", Uuid::new_v4()))
            .add_header("authorization", auth)
            .json(&json!({ "status": "teleported" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
