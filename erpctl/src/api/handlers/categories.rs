//! Product categories. Small per-company lists, so no pagination.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        categories::{CategoryCreate, CategoryResponse, CategoryUpdate},
        profiles::CurrentUser,
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::Categories,
        models::categories::{CategoryCreateDBRequest, CategoryUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{CategoryId, Operation, Resource},
};

#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    summary = "List categories",
    responses((status = 200, description = "Categories with product counts", body = Vec<CategoryResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_categories(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<CategoryResponse>>> {
    permissions::require(&user, Resource::Inventory, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let categories = Categories::new(&mut tx, user.company_id).list().await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    summary = "Create category",
    request_body = CategoryCreate,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Duplicate name"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    permissions::require(&user, Resource::Inventory, Operation::Create)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let category = Categories::new(&mut tx, user.company_id)
        .create(&CategoryCreateDBRequest::from(create))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

#[utoipa::path(
    patch,
    path = "/categories/{id}",
    tag = "categories",
    summary = "Update category",
    request_body = CategoryUpdate,
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    user: CurrentUser,
    Json(update): Json<CategoryUpdate>,
) -> Result<Json<CategoryResponse>> {
    permissions::require(&user, Resource::Inventory, Operation::Update)?;
    update.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let category = Categories::new(&mut tx, user.company_id)
        .update(id, &CategoryUpdateDBRequest::from(update))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CategoryResponse::from(category)))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    summary = "Delete category",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted; its products become uncategorized"),
        (status = 404, description = "Category not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_category(State(state): State<AppState>, Path(id): Path<CategoryId>, user: CurrentUser) -> Result<StatusCode> {
    permissions::require(&user, Resource::Inventory, Operation::Delete)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    if !Categories::new(&mut tx, user.company_id).delete(id).await? {
        return Err(Error::not_found("Category", id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
