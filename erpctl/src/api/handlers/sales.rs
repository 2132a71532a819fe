//! Point-of-sale sales.
//!
//! A sale is recorded in one transaction: header, priced lines and one stock deduction per product.
//! If any product runs out the whole sale is rolled back.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use super::products::apply_stock_change;
use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        profiles::CurrentUser,
        sales::{ListSalesQuery, SaleCreate, SaleDetail, SaleItemResponse, SaleResponse, VoidSaleRequest},
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Companies, Customers, Products, Repository, Sales, sales::SaleFilter},
        models::{
            products::StockChange,
            sales::{SaleCreateDBRequest, SaleDBResponse, SaleItemCreateDBRequest, SaleItemDBResponse},
        },
    },
    errors::{Error, Result},
    inventory::{MovementReason, merge_quantities},
    sequences::{DocumentKind, SequenceSettings, insert_numbered},
    totals::{DocumentTotals, LineInput, line_total, round_money},
    types::{CompanyId, CustomerId, Operation, Resource, SaleId},
};

pub(crate) async fn ensure_customer(conn: &mut PgConnection, company_id: CompanyId, id: Option<CustomerId>) -> Result<()> {
    let Some(id) = id else { return Ok(()) };
    match Customers::new(conn, company_id).get_by_id(id).await? {
        Some(customer) if customer.deleted_at.is_none() => Ok(()),
        _ => Err(Error::not_found("Customer", id)),
    }
}

/// The company's default tax rate, used when a document does not set its own.
pub(crate) async fn company_tax_rate(conn: &mut PgConnection, company_id: CompanyId) -> Result<Decimal> {
    let company = Companies::new(conn)
        .get(company_id)
        .await?
        .ok_or_else(|| Error::not_found("Company", company_id))?;
    Ok(company.tax_rate)
}

/// Price, number and record a sale, deducting stock for every line.
///
/// Shared by the POS endpoint and quote conversion. Runs on the caller's transaction.
pub(crate) async fn record_sale(
    conn: &mut PgConnection,
    state: &AppState,
    user: &CurrentUser,
    create: SaleCreate,
) -> Result<(SaleDBResponse, Vec<SaleItemDBResponse>)> {
    create.validate()?;
    let company_id = user.company_id;
    ensure_customer(&mut *conn, company_id, create.customer_id).await?;

    let ids: Vec<_> = create.items.iter().map(|item| item.product_id).collect();
    let products = Products::new(&mut *conn, company_id).get_bulk(ids).await?;

    let mut items = Vec::with_capacity(create.items.len());
    for item in &create.items {
        let product = products
            .get(&item.product_id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| Error::not_found("Product", item.product_id))?;
        if !product.active {
            return Err(Error::bad_request(format!("{} is inactive and cannot be sold", product.name)));
        }
        let unit_price = round_money(item.unit_price.unwrap_or(product.sale_price));
        items.push(SaleItemCreateDBRequest {
            product_id: product.id,
            description: product.name.clone(),
            quantity: item.quantity,
            unit_price,
            line_total: line_total(item.quantity, unit_price)?,
        });
    }

    let tax_rate = match create.tax_rate {
        Some(rate) => rate,
        None => company_tax_rate(&mut *conn, company_id).await?,
    };
    let lines: Vec<LineInput> = items
        .iter()
        .map(|item| LineInput {
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();
    let totals = DocumentTotals::compute(&lines, create.discount.unwrap_or_default(), tax_rate)?;

    let request = SaleCreateDBRequest {
        customer_id: create.customer_id,
        payment_method: create.payment_method,
        totals,
        notes: create.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        created_by: Some(user.id),
    };
    let settings = SequenceSettings::from(&state.config.sequences);
    let sale = insert_numbered(&mut *conn, DocumentKind::Sale, company_id, &settings, |conn, number| {
        let request = request.clone();
        Box::pin(async move { Sales::new(conn, company_id).create(&request, &number).await })
    })
    .await?;

    let items = Sales::new(&mut *conn, company_id).add_items(sale.id, &items).await?;

    // One movement per product, locked in product order
    let deductions = merge_quantities(items.iter().map(|item| (item.product_id, item.quantity)))?;
    for (product_id, quantity) in deductions {
        let change = StockChange::new(product_id, -quantity, MovementReason::Sale)
            .reference(sale.id)
            .actor(user.id);
        apply_stock_change(&mut *conn, company_id, state.config.notifications.in_app, change).await?;
    }

    tracing::info!(sale_number = %sale.sale_number, total = %sale.total, "Recorded sale");
    Ok((sale, items))
}

fn detail(sale: SaleDBResponse, items: Vec<SaleItemDBResponse>) -> SaleDetail {
    SaleDetail {
        sale: SaleResponse::from(sale),
        items: items.into_iter().map(SaleItemResponse::from).collect(),
    }
}

#[utoipa::path(
    get,
    path = "/sales",
    tag = "sales",
    summary = "List sales",
    params(ListSalesQuery),
    responses(
        (status = 200, description = "Sales in the date range, newest first", body = PaginatedResponse<SaleResponse>),
        (status = 400, description = "Invalid date range"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<ListSalesQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<SaleResponse>>> {
    permissions::require(&user, Resource::Sales, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let window = query.range.bounds(Utc::now().date_naive())?;
    let filter = SaleFilter {
        status: query.status,
        created_between: Some(window),
        ..SaleFilter::new(skip, limit).with_search(query.search)
    };

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Sales::new(&mut tx, user.company_id);
    let sales = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = sales.into_iter().map(SaleResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/sales",
    tag = "sales",
    summary = "Record a sale",
    request_body = SaleCreate,
    responses(
        (status = 201, description = "Sale recorded and stock deducted", body = SaleDetail),
        (status = 400, description = "Invalid items, discount, or insufficient stock"),
        (status = 404, description = "Customer or product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_sale(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<SaleCreate>,
) -> Result<(StatusCode, Json<SaleDetail>)> {
    permissions::require(&user, Resource::Sales, Operation::Create)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let (sale, items) = record_sale(&mut tx, &state, &user, create).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(detail(sale, items))))
}

#[utoipa::path(
    get,
    path = "/sales/{id}",
    tag = "sales",
    summary = "Get sale",
    params(("id" = uuid::Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale with its lines", body = SaleDetail),
        (status = 404, description = "Sale not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_sale(State(state): State<AppState>, Path(id): Path<SaleId>, user: CurrentUser) -> Result<Json<SaleDetail>> {
    permissions::require(&user, Resource::Sales, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Sales::new(&mut tx, user.company_id);
    let sale = repo.get(id).await?.ok_or_else(|| Error::not_found("Sale", id))?;
    let items = repo.list_items(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(detail(sale, items)))
}

/// Void a completed sale and put its units back into stock.
#[utoipa::path(
    post,
    path = "/sales/{id}/void",
    tag = "sales",
    summary = "Void a sale",
    request_body = VoidSaleRequest,
    params(("id" = uuid::Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale voided and stock restored", body = SaleDetail),
        (status = 400, description = "Sale already voided"),
        (status = 404, description = "Sale not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(sale_id = %id))]
pub async fn void_sale(
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
    user: CurrentUser,
    Json(request): Json<VoidSaleRequest>,
) -> Result<Json<SaleDetail>> {
    permissions::require(&user, Resource::Sales, Operation::Delete)?;
    let company_id = user.company_id;
    let reason = request.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    let mut tx = begin_scoped(&state.db, company_id).await?;
    let mut repo = Sales::new(&mut tx, company_id);
    let Some(sale) = repo.mark_voided(id, reason.as_deref()).await? else {
        return Err(match repo.get(id).await? {
            Some(sale) => Error::bad_request(format!("Sale {} has already been voided", sale.sale_number)),
            None => Error::not_found("Sale", id),
        });
    };
    let items = repo.list_items(id).await?;

    let restores = merge_quantities(items.iter().map(|item| (item.product_id, item.quantity)))?;
    for (product_id, quantity) in restores {
        let change = StockChange::new(product_id, quantity, MovementReason::SaleVoid)
            .reference(id)
            .note(reason.clone())
            .actor(user.id);
        apply_stock_change(&mut tx, company_id, false, change).await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(sale_number = %sale.sale_number, "Voided sale");
    Ok(Json(detail(sale, items)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::profiles::Role;
    use crate::test_utils::{bearer, create_test_config, create_test_server};
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn empty_sale_is_rejected() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Staff);
        let server = create_test_server(config);

        let response = server
            .post("/api/v1/sales")
            .add_header("authorization", auth)
            .json(&json!({ "payment_method": "cash", "items": [] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["error"], "A sale needs at least one item");
    }

    #[tokio::test]
    async fn staff_cannot_void_sales() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Staff);
        let server = create_test_server(config);

        let response = server
            .post(&format!("/api/v1/sales/{}/void", Uuid::new_v4()))
            .add_header("authorization", auth)
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn inverted_date_range_is_rejected() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Admin);
        let server = create_test_server(config);

        let response = server
            .get("/api/v1/sales?from=2025-04-02&to=2025-04-01")
            .add_header("authorization", auth)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
