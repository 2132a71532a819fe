//! Staff accounts within the caller's company.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        profiles::{CurrentUser, ListProfilesQuery, ProfileCreate, ProfileResponse, ProfileUpdate, Role},
    },
    auth::{password, permissions},
    db::{
        begin_scoped,
        handlers::{Profiles, Repository, profiles::ProfileFilter},
        models::profiles::{ProfileCreateDBRequest, ProfileUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{Operation, Permission, ProfileId, Resource},
};

/// Only an owner may hand out the owner role.
fn check_role_grant(user: &CurrentUser, role: Role) -> Result<()> {
    if role == Role::Owner && user.role != Role::Owner {
        return Err(Error::InsufficientPermissions {
            required: Permission::Allow(Resource::Company, Operation::Update),
            action: Operation::Update,
            resource: Resource::Profiles,
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/profiles",
    tag = "profiles",
    summary = "List profiles",
    params(ListProfilesQuery),
    responses(
        (status = 200, description = "Profiles", body = PaginatedResponse<ProfileResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListProfilesQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<ProfileResponse>>> {
    permissions::require(&user, Resource::Profiles, Operation::Read)?;
    let (skip, limit) = query.pagination.params();
    let filter = ProfileFilter::new(skip, limit).with_search(query.search);

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = Profiles::new(&mut tx, user.company_id);
    let profiles = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = profiles.into_iter().map(ProfileResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/profiles",
    tag = "profiles",
    summary = "Create profile",
    request_body = ProfileCreate,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(create): Json<ProfileCreate>,
) -> Result<(StatusCode, Json<ProfileResponse>)> {
    permissions::require(&user, Resource::Profiles, Operation::Create)?;
    create.validate()?;
    check_role_grant(&user, create.role)?;

    let password_hash = match create.password {
        Some(password) => {
            password::validate_length(&password, &state.config.auth.password)?;
            Some(password::hash_password(password, (&state.config.auth.password).into()).await?)
        }
        None => None,
    };

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let profile = Profiles::new(&mut tx, user.company_id)
        .create(&ProfileCreateDBRequest {
            email: create.email.trim().to_lowercase(),
            full_name: create.full_name.trim().to_string(),
            role: create.role,
            password_hash,
        })
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(ProfileResponse::from(profile))))
}

#[utoipa::path(
    patch,
    path = "/profiles/{id}",
    tag = "profiles",
    summary = "Update profile",
    request_body = ProfileUpdate,
    params(("id" = uuid::Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Profile not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<ProfileId>,
    user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    permissions::require(&user, Resource::Profiles, Operation::Update)?;
    update.validate()?;
    if let Some(role) = update.role {
        check_role_grant(&user, role)?;
    }
    if id == user.id && (update.role.is_some_and(|role| role != user.role) || update.active == Some(false)) {
        return Err(Error::bad_request("You cannot change your own role or deactivate yourself"));
    }

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let profile = Profiles::new(&mut tx, user.company_id)
        .update(id, &ProfileUpdateDBRequest::from(update))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ProfileResponse::from(profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "a@example.com".into(),
            full_name: "A".into(),
            role,
        }
    }

    #[test]
    fn only_owners_grant_owner() {
        assert!(check_role_grant(&user(Role::Owner), Role::Owner).is_ok());
        assert!(check_role_grant(&user(Role::Admin), Role::Owner).is_err());
        assert!(check_role_grant(&user(Role::Admin), Role::Staff).is_ok());
    }
}
