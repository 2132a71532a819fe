//! The signed-in profile and its company.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        companies::{CompanyResponse, CompanyUpdate},
        profiles::{CurrentUser, ProfileResponse},
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{Companies, Profiles, Repository},
        models::companies::CompanyUpdateDBRequest,
    },
    errors::{Error, Result},
    types::{Operation, Resource},
};

#[utoipa::path(
    get,
    path = "/me",
    tag = "profiles",
    summary = "Current profile",
    responses(
        (status = 200, description = "The signed-in profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<ProfileResponse>> {
    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let profile = Profiles::new(&mut tx, user.company_id)
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| Error::not_found("Profile", user.id))?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ProfileResponse::from(profile)))
}

#[utoipa::path(
    get,
    path = "/company",
    tag = "company",
    summary = "Get company settings",
    responses(
        (status = 200, description = "Company", body = CompanyResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_company(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CompanyResponse>> {
    permissions::require(&user, Resource::Company, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let company = Companies::new(&mut tx)
        .get(user.company_id)
        .await?
        .ok_or_else(|| Error::not_found("Company", user.company_id))?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CompanyResponse::from(company)))
}

#[utoipa::path(
    patch,
    path = "/company",
    tag = "company",
    summary = "Update company settings",
    request_body = CompanyUpdate,
    responses(
        (status = 200, description = "Company updated", body = CompanyResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Only the owner may change company settings"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_company(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(update): Json<CompanyUpdate>,
) -> Result<Json<CompanyResponse>> {
    permissions::require(&user, Resource::Company, Operation::Update)?;
    update.validate()?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let company = Companies::new(&mut tx)
        .update(user.company_id, &CompanyUpdateDBRequest::from(update))
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CompanyResponse::from(company)))
}
