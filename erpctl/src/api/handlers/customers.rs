//! Customer records.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        customers::{CustomerCreate, CustomerResponse, CustomerUpdate, ListCustomersQuery},
        pagination::PaginatedResponse,
        profiles::CurrentUser,
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Customers, Repository, customers::CustomerFilter},
        models::customers::{CustomerCreateDBRequest, CustomerUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{CustomerId, Operation, Resource},
};

#[utoipa::path(
    get,
    path = "/customers",
    tag = "customers",
    summary = "List customers",
    params(ListCustomersQuery),
    responses(
        (status = 200, description = "Paginated customers", body = PaginatedResponse<CustomerResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListCustomersQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<CustomerResponse>>> {
    permissions::require(&user, Resource::Customers, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = CustomerFilter::new(skip, limit).with_search(query.search);

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Customers::new(&mut tx, user.company_id);
    let rows = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = rows.into_iter().map(CustomerResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/customers",
    tag = "customers",
    summary = "Create customer",
    request_body = CustomerCreate,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<CustomerCreate>,
) -> Result<(StatusCode, Json<CustomerResponse>)> {
    permissions::require(&user, Resource::Customers, Operation::Create)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let created = Customers::new(&mut tx, user.company_id)
        .create(&CustomerCreateDBRequest::from(create))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/customers/{id}",
    tag = "customers",
    summary = "Get customer",
    params(("id" = uuid::Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer", body = CustomerResponse),
        (status = 404, description = "Customer not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<CustomerId>,
    user: CurrentUser,
) -> Result<Json<CustomerResponse>> {
    permissions::require(&user, Resource::Customers, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let found = Customers::new(&mut tx, user.company_id)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Customer", id))?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CustomerResponse::from(found)))
}

#[utoipa::path(
    patch,
    path = "/customers/{id}",
    tag = "customers",
    summary = "Update customer",
    request_body = CustomerUpdate,
    params(("id" = uuid::Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer updated", body = CustomerResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Customer not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<CustomerId>,
    user: CurrentUser,
    Json(update): Json<CustomerUpdate>,
) -> Result<Json<CustomerResponse>> {
    permissions::require(&user, Resource::Customers, Operation::Update)?;
    update.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let updated = Customers::new(&mut tx, user.company_id)
        .update(id, &CustomerUpdateDBRequest::from(update))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CustomerResponse::from(updated)))
}

/// Soft delete: the customer disappears from listings but stays on past repairs and sales.
#[utoipa::path(
    delete,
    path = "/customers/{id}",
    tag = "customers",
    summary = "Delete customer",
    params(("id" = uuid::Uuid, Path, description = "Customer ID")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<CustomerId>,
    user: CurrentUser,
) -> Result<StatusCode> {
    permissions::require(&user, Resource::Customers, Operation::Delete)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let deleted = Customers::new(&mut tx, user.company_id).delete(id).await?;
    if !deleted {
        return Err(Error::not_found("Customer", id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
