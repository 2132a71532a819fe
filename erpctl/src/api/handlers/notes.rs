//! The staff notice board.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        notes::{InternalNoteCreate, InternalNoteResponse, InternalNoteUpdate, ListNotesQuery},
        pagination::PaginatedResponse,
        profiles::{CurrentUser, Role},
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{InternalNotes, Repository, notes::NoteFilter},
        models::notes::{InternalNoteCreateDBRequest, InternalNoteDBResponse, InternalNoteUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{NoteId, Operation, Permission, Resource},
};

/// Notes are edited by their author; owners and admins may edit anyone's.
fn check_author(user: &CurrentUser, note: &InternalNoteDBResponse, operation: Operation) -> Result<()> {
    if matches!(user.role, Role::Owner | Role::Admin) || note.author_id == Some(user.id) {
        return Ok(());
    }
    Err(Error::InsufficientPermissions {
        required: Permission::Allow(Resource::Notes, operation),
        action: operation,
        resource: Resource::Notes,
    })
}

#[utoipa::path(
    get,
    path = "/notes",
    tag = "notes",
    summary = "List notes",
    params(ListNotesQuery),
    responses((status = 200, description = "Pinned notes first, then newest", body = PaginatedResponse<InternalNoteResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<ListNotesQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<InternalNoteResponse>>> {
    permissions::require(&user, Resource::Notes, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = NoteFilter::new(skip, limit).with_search(query.search);

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = InternalNotes::new(&mut tx, user.company_id);
    let notes = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = notes.into_iter().map(InternalNoteResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/notes",
    tag = "notes",
    summary = "Post a note",
    request_body = InternalNoteCreate,
    responses(
        (status = 201, description = "Note created", body = InternalNoteResponse),
        (status = 400, description = "Missing title"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<InternalNoteCreate>,
) -> Result<(StatusCode, Json<InternalNoteResponse>)> {
    permissions::require(&user, Resource::Notes, Operation::Create)?;
    create.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let note = InternalNotes::new(&mut tx, user.company_id)
        .create(&InternalNoteCreateDBRequest::new(user.id, create))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(InternalNoteResponse::from(note))))
}

#[utoipa::path(
    patch,
    path = "/notes/{id}",
    tag = "notes",
    summary = "Edit a note",
    request_body = InternalNoteUpdate,
    params(("id" = uuid::Uuid, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note updated", body = InternalNoteResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Note not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<NoteId>,
    user: CurrentUser,
    Json(update): Json<InternalNoteUpdate>,
) -> Result<Json<InternalNoteResponse>> {
    permissions::require(&user, Resource::Notes, Operation::Update)?;
    update.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = InternalNotes::new(&mut tx, user.company_id);
    let existing = repo.get_by_id(id).await?.ok_or_else(|| Error::not_found("Note", id))?;
    check_author(&user, &existing, Operation::Update)?;
    let note = repo.update(id, &InternalNoteUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(InternalNoteResponse::from(note)))
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    tag = "notes",
    summary = "Delete a note",
    params(("id" = uuid::Uuid, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Note not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_note(State(state): State<AppState>, Path(id): Path<NoteId>, user: CurrentUser) -> Result<StatusCode> {
    permissions::require(&user, Resource::Notes, Operation::Delete)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = InternalNotes::new(&mut tx, user.company_id);
    let existing = repo.get_by_id(id).await?.ok_or_else(|| Error::not_found("Note", id))?;
    check_author(&user, &existing, Operation::Delete)?;
    repo.delete(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "eva@example.com".to_string(),
            full_name: "Eva".to_string(),
            role,
        }
    }

    fn note(author_id: Option<Uuid>) -> InternalNoteDBResponse {
        InternalNoteDBResponse {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            author_id,
            author_name: None,
            title: "Supplier visit".to_string(),
            body: String::new(),
            pinned: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn authors_and_managers_may_edit() {
        let staff = user(Role::Staff);
        assert!(check_author(&staff, &note(Some(staff.id)), Operation::Update).is_ok());
        assert!(check_author(&staff, &note(Some(Uuid::new_v4())), Operation::Update).is_err());
        assert!(check_author(&staff, &note(None), Operation::Delete).is_err());
        assert!(check_author(&user(Role::Admin), &note(Some(Uuid::new_v4())), Operation::Delete).is_ok());
    }
}
