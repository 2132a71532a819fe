//! In-app notifications. A profile sees its own notifications plus company-wide ones.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        notifications::{ListNotificationsQuery, MarkAllReadResponse, NotificationResponse, UnreadCountResponse},
        pagination::PaginatedResponse,
        profiles::CurrentUser,
    },
    auth::permissions,
    db::{begin_scoped, handlers::Notifications},
    errors::{Error, Result},
    types::{NotificationId, Operation, Resource},
};

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    summary = "List notifications",
    params(ListNotificationsQuery),
    responses((status = 200, description = "Newest first", body = PaginatedResponse<NotificationResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<NotificationResponse>>> {
    permissions::require(&user, Resource::Notifications, Operation::Read)?;
    let (skip, limit) = query.pagination.params();

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Notifications::new(&mut tx, user.company_id);
    let rows = repo.list_for(user.id, query.unread_only, skip, limit).await?;
    let total = repo.count_for(user.id, query.unread_only).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = rows.into_iter().map(NotificationResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "notifications",
    summary = "Unread count",
    responses((status = 200, description = "Unread notifications visible to the caller", body = UnreadCountResponse)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn unread_count(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UnreadCountResponse>> {
    permissions::require(&user, Resource::Notifications, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let count = Notifications::new(&mut tx, user.company_id).count_for(user.id, true).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(UnreadCountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notifications",
    summary = "Mark as read",
    params(("id" = uuid::Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Marked read (idempotent)"),
        (status = 404, description = "Notification not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_read(State(state): State<AppState>, Path(id): Path<NotificationId>, user: CurrentUser) -> Result<StatusCode> {
    permissions::require(&user, Resource::Notifications, Operation::Update)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    if !Notifications::new(&mut tx, user.company_id).mark_read(id, user.id).await? {
        return Err(Error::not_found("Notification", id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "notifications",
    summary = "Mark all as read",
    responses((status = 200, description = "Number of notifications marked", body = MarkAllReadResponse)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_all_read(State(state): State<AppState>, user: CurrentUser) -> Result<Json<MarkAllReadResponse>> {
    permissions::require(&user, Resource::Notifications, Operation::Update)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let updated = Notifications::new(&mut tx, user.company_id).mark_all_read(user.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(MarkAllReadResponse { updated }))
}
