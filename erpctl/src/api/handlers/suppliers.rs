//! Supplier records.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        suppliers::{SupplierCreate, SupplierResponse, SupplierUpdate, ListSuppliersQuery},
        pagination::PaginatedResponse,
        profiles::CurrentUser,
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Suppliers, Repository, suppliers::SupplierFilter},
        models::suppliers::{SupplierCreateDBRequest, SupplierUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{SupplierId, Operation, Resource},
};

#[utoipa::path(
    get,
    path = "/suppliers",
    tag = "suppliers",
    summary = "List suppliers",
    params(ListSuppliersQuery),
    responses(
        (status = 200, description = "Paginated suppliers", body = PaginatedResponse<SupplierResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<ListSuppliersQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<SupplierResponse>>> {
    permissions::require(&user, Resource::Suppliers, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = SupplierFilter::new(skip, limit).with_search(query.search);

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Suppliers::new(&mut tx, user.company_id);
    let rows = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = rows.into_iter().map(SupplierResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/suppliers",
    tag = "suppliers",
    summary = "Create supplier",
    request_body = SupplierCreate,
    responses(
        (status = 201, description = "Supplier created", body = SupplierResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<SupplierCreate>,
) -> Result<(StatusCode, Json<SupplierResponse>)> {
    permissions::require(&user, Resource::Suppliers, Operation::Create)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let created = Suppliers::new(&mut tx, user.company_id)
        .create(&SupplierCreateDBRequest::from(create))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(SupplierResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/suppliers/{id}",
    tag = "suppliers",
    summary = "Get supplier",
    params(("id" = uuid::Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier", body = SupplierResponse),
        (status = 404, description = "Supplier not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
    user: CurrentUser,
) -> Result<Json<SupplierResponse>> {
    permissions::require(&user, Resource::Suppliers, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let found = Suppliers::new(&mut tx, user.company_id)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Supplier", id))?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SupplierResponse::from(found)))
}

#[utoipa::path(
    patch,
    path = "/suppliers/{id}",
    tag = "suppliers",
    summary = "Update supplier",
    request_body = SupplierUpdate,
    params(("id" = uuid::Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Supplier not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
    user: CurrentUser,
    Json(update): Json<SupplierUpdate>,
) -> Result<Json<SupplierResponse>> {
    permissions::require(&user, Resource::Suppliers, Operation::Update)?;
    update.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let updated = Suppliers::new(&mut tx, user.company_id)
        .update(id, &SupplierUpdateDBRequest::from(update))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SupplierResponse::from(updated)))
}

/// Soft delete: existing purchase orders keep their supplier.
#[utoipa::path(
    delete,
    path = "/suppliers/{id}",
    tag = "suppliers",
    summary = "Delete supplier",
    params(("id" = uuid::Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 404, description = "Supplier not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
    user: CurrentUser,
) -> Result<StatusCode> {
    permissions::require(&user, Resource::Suppliers, Operation::Delete)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let deleted = Suppliers::new(&mut tx, user.company_id).delete(id).await?;
    if !deleted {
        return Err(Error::not_found("Supplier", id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
