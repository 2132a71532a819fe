//! Cash register shifts: open with a float, watch the running totals, close with a count.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        cash_register::{
            CashCloseRequest, CashClosureResponse, CashOpenRequest, CashOpeningResponse, CurrentRegisterResponse, ListClosuresQuery,
        },
        pagination::PaginatedResponse,
        profiles::CurrentUser,
    },
    auth::permissions,
    cash::Reconciliation,
    db::{begin_scoped, handlers::CashRegister},
    errors::{Error, Result},
    totals::round_money,
    types::{Operation, Resource},
};

#[utoipa::path(
    get,
    path = "/cash-register/current",
    tag = "cash-register",
    summary = "Current shift",
    responses((status = 200, description = "Open shift with running totals, or null when the register is closed", body = Option<CurrentRegisterResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn current_register(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Option<CurrentRegisterResponse>>> {
    permissions::require(&user, Resource::CashRegister, Operation::Read)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = CashRegister::new(&mut tx, user.company_id);
    let current = match repo.current().await? {
        Some(opening) => {
            let totals = repo.totals_since(opening.opened_at).await?;
            Some(CurrentRegisterResponse {
                expected_cash: round_money(opening.opening_amount + totals.cash_in()),
                opening: CashOpeningResponse::from(opening),
                totals,
            })
        }
        None => None,
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(current))
}

#[utoipa::path(
    post,
    path = "/cash-register/open",
    tag = "cash-register",
    summary = "Open the register",
    request_body = CashOpenRequest,
    responses(
        (status = 201, description = "Shift opened", body = CashOpeningResponse),
        (status = 400, description = "Negative float"),
        (status = 409, description = "The register is already open"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn open_register(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CashOpenRequest>,
) -> Result<(StatusCode, Json<CashOpeningResponse>)> {
    permissions::require(&user, Resource::CashRegister, Operation::Create)?;
    request.validate()?;
    let notes = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let opening = CashRegister::new(&mut tx, user.company_id)
        .open(user.id, round_money(request.opening_amount), notes)
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(CashOpeningResponse::from(opening))))
}

/// Close the open shift. The counted cash is compared with the float plus every cash sale and
/// cash repair payment taken since opening.
#[utoipa::path(
    post,
    path = "/cash-register/close",
    tag = "cash-register",
    summary = "Close the register",
    request_body = CashCloseRequest,
    responses(
        (status = 201, description = "Shift closed with its reconciliation", body = CashClosureResponse),
        (status = 400, description = "Register not open or negative count"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn close_register(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CashCloseRequest>,
) -> Result<(StatusCode, Json<CashClosureResponse>)> {
    permissions::require(&user, Resource::CashRegister, Operation::Update)?;
    request.validate()?;
    let notes = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = CashRegister::new(&mut tx, user.company_id);
    let opening = repo
        .current_for_update()
        .await?
        .ok_or_else(|| Error::bad_request("The cash register is not open"))?;
    let totals = repo.totals_since(opening.opened_at).await?;
    let reconciliation = Reconciliation::compute(opening.opening_amount, totals, request.counted_cash);
    let closure = repo.close(opening.id, user.id, &reconciliation, notes).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(difference = %reconciliation.difference, "Closed cash register");
    Ok((StatusCode::CREATED, Json(CashClosureResponse::from(closure))))
}

#[utoipa::path(
    get,
    path = "/cash-register/closures",
    tag = "cash-register",
    summary = "Closure history",
    params(ListClosuresQuery),
    responses((status = 200, description = "Closed shifts, most recent first", body = PaginatedResponse<CashClosureResponse>)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_closures(
    State(state): State<AppState>,
    Query(query): Query<ListClosuresQuery>,
    user: CurrentUser,
) -> Result<Json<PaginatedResponse<CashClosureResponse>>> {
    permissions::require(&user, Resource::CashRegister, Operation::Read)?;
    let (skip, limit) = query.pagination.params();

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut repo = CashRegister::new(&mut tx, user.company_id);
    let closures = repo.list_closures(skip, limit).await?;
    let total = repo.count_closures().await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let data = closures.into_iter().map(CashClosureResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::profiles::Role;
    use crate::test_utils::{bearer, create_test_config, create_test_server};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn negative_float_is_rejected() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Staff);
        let server = create_test_server(config);

        let response = server
            .post("/api/v1/cash-register/open")
            .add_header("authorization", auth)
            .json(&json!({ "opening_amount": "-5.00" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["error"], "Opening amount cannot be negative");
    }

    #[tokio::test]
    async fn technicians_have_no_register_access() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Technician);
        let server = create_test_server(config);

        server
            .get("/api/v1/cash-register/current")
            .add_header("authorization", auth)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
