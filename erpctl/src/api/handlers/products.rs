//! Catalog, stock levels and variants.
//!
//! Stock only changes through [`Products::adjust_stock`], which refuses to go below zero and
//! writes a movement row for every change. Sales, repairs and purchase orders call the helpers
//! at the top of this module so low-stock notifications are raised in one place.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgConnection;

use crate::{
    AppState,
    api::models::{
        notifications::NotificationKind,
        pagination::{PaginatedResponse, Pagination},
        products::{
            ListProductsQuery, ProductCreate, ProductResponse, ProductUpdate, StockAdjustment, StockMovementResponse,
            VariantCreate, VariantResponse,
        },
        profiles::CurrentUser,
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Categories, Notifications, Products, Repository, products::ProductFilter},
        models::{
            notifications::NotificationCreateDBRequest,
            products::{ProductCreateDBRequest, ProductUpdateDBRequest, StockChange, StockLevel, VariantCreateDBRequest},
        },
    },
    errors::{Error, Result},
    inventory::{MovementReason, is_low_stock},
    types::{CategoryId, CompanyId, Operation, ProductId, Resource, VariantId},
};

/// Apply a stock change and, when it takes the product down to its minimum, leave a company-wide
/// low-stock notification in the same transaction.
pub(crate) async fn apply_stock_change(
    conn: &mut PgConnection,
    company_id: CompanyId,
    in_app: bool,
    change: StockChange,
) -> Result<StockLevel> {
    let level = Products::new(&mut *conn, company_id).adjust_stock(&change).await?;

    let before = level.stock - change.delta;
    if in_app && change.delta < 0 && !is_low_stock(before, level.min_stock) && is_low_stock(level.stock, level.min_stock) {
        Notifications::new(&mut *conn, company_id)
            .create(
                &NotificationCreateDBRequest::company_wide(
                    NotificationKind::LowStock,
                    format!("Low stock: {}", level.name),
                    format!("{} units left (minimum {})", level.stock, level.min_stock),
                )
                .about(level.product_id),
            )
            .await?;
        tracing::info!(product_id = %level.product_id, stock = level.stock, "Product reached minimum stock");
    }
    Ok(level)
}

/// Foreign keys are not confined by row-level security, so references are checked explicitly.
pub(crate) async fn ensure_category(conn: &mut PgConnection, company_id: CompanyId, category_id: Option<CategoryId>) -> Result<()> {
    if let Some(id) = category_id
        && Categories::new(conn, company_id).get_by_id(id).await?.is_none()
    {
        return Err(Error::not_found("Category", id));
    }
    Ok(())
}

async fn load_product(conn: &mut PgConnection, company_id: CompanyId, id: ProductId) -> Result<ProductResponse> {
    Products::new(conn, company_id)
        .get_by_id(id)
        .await?
        .map(ProductResponse::from)
        .ok_or_else(|| Error::not_found("Product", id))
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    summary = "List products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Paginated products", body = PaginatedResponse<ProductResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<ProductResponse>>> {
    permissions::require(&user, Resource::Inventory, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = ProductFilter::new(skip, limit)
        .with_search(query.search)
        .with_category(query.category_id)
        .include_inactive(query.include_inactive);

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Products::new(&mut tx, user.company_id);
    let products = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = products.into_iter().map(ProductResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    summary = "Create product",
    request_body = ProductCreate,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Duplicate SKU"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<ProductCreate>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    permissions::require(&user, Resource::Inventory, Operation::Create)?;
    create.validate()?;
    let opening_stock = create.stock.unwrap_or(0);

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    ensure_category(&mut tx, user.company_id, create.category_id).await?;
    let product = Products::new(&mut tx, user.company_id)
        .create(&ProductCreateDBRequest::from(create))
        .await?;

    if opening_stock > 0 {
        let change = StockChange::new(product.id, opening_stock, MovementReason::Adjustment)
            .note(Some("Opening stock".to_string()))
            .actor(user.id);
        Products::new(&mut tx, user.company_id).adjust_stock(&change).await?;
    }
    let response = load_product(&mut tx, user.company_id, product.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    summary = "Get product",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    user: CurrentUser,
) -> Result<Json<ProductResponse>> {
    permissions::require(&user, Resource::Inventory, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let product = load_product(&mut tx, user.company_id, id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(product))
}

#[utoipa::path(
    patch,
    path = "/products/{id}",
    tag = "products",
    summary = "Update product",
    request_body = ProductUpdate,
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    user: CurrentUser,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<ProductResponse>> {
    permissions::require(&user, Resource::Inventory, Operation::Update)?;
    update.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    ensure_category(&mut tx, user.company_id, update.category_id).await?;
    let product = Products::new(&mut tx, user.company_id)
        .update(id, &ProductUpdateDBRequest::from(update))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ProductResponse::from(product)))
}

/// Soft delete; movements and document lines keep pointing at the product.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    summary = "Delete product",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_product(State(state): State<AppState>, Path(id): Path<ProductId>, user: CurrentUser) -> Result<StatusCode> {
    permissions::require(&user, Resource::Inventory, Operation::Delete)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    if !Products::new(&mut tx, user.company_id).delete(id).await? {
        return Err(Error::not_found("Product", id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/products/low-stock",
    tag = "products",
    summary = "Products at or below minimum stock",
    responses(
        (status = 200, description = "Low-stock products, most depleted first", body = Vec<ProductResponse>),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_low_stock(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<ProductResponse>>> {
    permissions::require(&user, Resource::Inventory, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let products = Products::new(&mut tx, user.company_id).list_low_stock().await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/products/{id}/movements",
    tag = "products",
    summary = "Stock movement history",
    params(("id" = uuid::Uuid, Path, description = "Product ID"), Pagination),
    responses(
        (status = 200, description = "Movements, newest first", body = PaginatedResponse<StockMovementResponse>),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Query(pagination): Query<Pagination>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<StockMovementResponse>>> {
    permissions::require(&user, Resource::Inventory, Operation::Read)?;
    let (skip, limit) = pagination.params();

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Products::new(&mut tx, user.company_id);
    let movements = repo.list_movements(id, skip, limit).await?;
    let total = repo.count_movements(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = movements.into_iter().map(StockMovementResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/products/{id}/stock-adjustments",
    tag = "products",
    summary = "Adjust stock manually",
    request_body = StockAdjustment,
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product after the adjustment", body = ProductResponse),
        (status = 400, description = "Zero quantity or insufficient stock"),
        (status = 404, description = "Product not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(product_id = %id))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    user: CurrentUser,
    Json(adjustment): Json<StockAdjustment>,
) -> Result<Json<ProductResponse>> {
    permissions::require(&user, Resource::Inventory, Operation::Update)?;
    adjustment.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    // confirms the product is live before touching stock
    load_product(&mut tx, user.company_id, id).await?;
    let change = StockChange::new(id, adjustment.quantity, MovementReason::Adjustment)
        .note(adjustment.note)
        .actor(user.id);
    apply_stock_change(&mut tx, user.company_id, state.config.notifications.in_app, change).await?;
    let product = load_product(&mut tx, user.company_id, id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(product))
}

#[utoipa::path(
    get,
    path = "/products/{id}/variants",
    tag = "products",
    summary = "List variants",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Variants", body = Vec<VariantResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_variants(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    user: CurrentUser,
) -> Result<Json<Vec<VariantResponse>>> {
    permissions::require(&user, Resource::Inventory, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let variants = Products::new(&mut tx, user.company_id).list_variants(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(variants.into_iter().map(VariantResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/products/{id}/variants",
    tag = "products",
    summary = "Create variant",
    request_body = VariantCreate,
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 201, description = "Variant created", body = VariantResponse),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Duplicate variant name"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_variant(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    user: CurrentUser,
    Json(create): Json<VariantCreate>,
) -> Result<(StatusCode, Json<VariantResponse>)> {
    permissions::require(&user, Resource::Inventory, Operation::Create)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let variant = Products::new(&mut tx, user.company_id)
        .create_variant(id, &VariantCreateDBRequest::from(create))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(VariantResponse::from(variant))))
}

#[utoipa::path(
    delete,
    path = "/products/{id}/variants/{variant_id}",
    tag = "products",
    summary = "Delete variant",
    params(
        ("id" = uuid::Uuid, Path, description = "Product ID"),
        ("variant_id" = uuid::Uuid, Path, description = "Variant ID"),
    ),
    responses(
        (status = 204, description = "Variant deleted"),
        (status = 404, description = "Variant not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_variant(
    State(state): State<AppState>,
    Path((id, variant_id)): Path<(ProductId, VariantId)>,
    user: CurrentUser,
) -> Result<StatusCode> {
    permissions::require(&user, Resource::Inventory, Operation::Delete)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    if !Products::new(&mut tx, user.company_id).delete_variant(id, variant_id).await? {
        return Err(Error::not_found("Variant", variant_id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
