//! Technicians that repair orders are assigned to.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        technicians::{TechnicianCreate, TechnicianResponse, TechnicianUpdate, ListTechniciansQuery},
        pagination::PaginatedResponse,
        profiles::CurrentUser,
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Technicians, Repository, technicians::TechnicianFilter},
        models::technicians::{TechnicianCreateDBRequest, TechnicianUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{TechnicianId, Operation, Resource},
};

#[utoipa::path(
    get,
    path = "/technicians",
    tag = "technicians",
    summary = "List technicians",
    params(ListTechniciansQuery),
    responses(
        (status = 200, description = "Paginated technicians", body = PaginatedResponse<TechnicianResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_technicians(
    State(state): State<AppState>,
    Query(query): Query<ListTechniciansQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<TechnicianResponse>>> {
    permissions::require(&user, Resource::Technicians, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = TechnicianFilter::new(skip, limit).with_search(query.search).include_inactive(query.include_inactive);

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Technicians::new(&mut tx, user.company_id);
    let rows = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = rows.into_iter().map(TechnicianResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/technicians",
    tag = "technicians",
    summary = "Create technician",
    request_body = TechnicianCreate,
    responses(
        (status = 201, description = "Technician created", body = TechnicianResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_technician(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<TechnicianCreate>,
) -> Result<(StatusCode, Json<TechnicianResponse>)> {
    permissions::require(&user, Resource::Technicians, Operation::Create)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let created = Technicians::new(&mut tx, user.company_id)
        .create(&TechnicianCreateDBRequest::from(create))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(TechnicianResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/technicians/{id}",
    tag = "technicians",
    summary = "Get technician",
    params(("id" = uuid::Uuid, Path, description = "Technician ID")),
    responses(
        (status = 200, description = "Technician", body = TechnicianResponse),
        (status = 404, description = "Technician not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_technician(
    State(state): State<AppState>,
    Path(id): Path<TechnicianId>,
    user: CurrentUser,
) -> Result<Json<TechnicianResponse>> {
    permissions::require(&user, Resource::Technicians, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let found = Technicians::new(&mut tx, user.company_id)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Technician", id))?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(TechnicianResponse::from(found)))
}

#[utoipa::path(
    patch,
    path = "/technicians/{id}",
    tag = "technicians",
    summary = "Update technician",
    request_body = TechnicianUpdate,
    params(("id" = uuid::Uuid, Path, description = "Technician ID")),
    responses(
        (status = 200, description = "Technician updated", body = TechnicianResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Technician not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_technician(
    State(state): State<AppState>,
    Path(id): Path<TechnicianId>,
    user: CurrentUser,
    Json(update): Json<TechnicianUpdate>,
) -> Result<Json<TechnicianResponse>> {
    permissions::require(&user, Resource::Technicians, Operation::Update)?;
    update.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let updated = Technicians::new(&mut tx, user.company_id)
        .update(id, &TechnicianUpdateDBRequest::from(update))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(TechnicianResponse::from(updated)))
}

/// Deactivates the technician; assigned orders keep the reference.
#[utoipa::path(
    delete,
    path = "/technicians/{id}",
    tag = "technicians",
    summary = "Delete technician",
    params(("id" = uuid::Uuid, Path, description = "Technician ID")),
    responses(
        (status = 204, description = "Technician deleted"),
        (status = 404, description = "Technician not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_technician(
    State(state): State<AppState>,
    Path(id): Path<TechnicianId>,
    user: CurrentUser,
) -> Result<StatusCode> {
    permissions::require(&user, Resource::Technicians, Operation::Delete)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let deleted = Technicians::new(&mut tx, user.company_id).delete(id).await?;
    if !deleted {
        return Err(Error::not_found("Technician", id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
