//! Dashboard counters, the sales summary, the liquidation report and CSV exports.

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};

use crate::{
    AppState,
    api::models::{
        pagination::DateRange,
        profiles::CurrentUser,
        reports::{DashboardResponse, SalesSummaryResponse},
    },
    auth::permissions,
    db::{
        begin_scoped,
        handlers::{CashRegister, Notifications, Reports},
    },
    errors::{Error, Result},
    exports::{CSV_CONTENT_TYPE, liquidation_csv, repairs_csv, sales_csv},
    inventory::LiquidationReport,
    types::{Operation, Resource},
};

fn csv_response(filename: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

/// `sales-2025-03-01_2025-03-31.csv`, naming the days actually covered.
fn export_filename(kind: &str, range: &DateRange, today: NaiveDate) -> String {
    let to = range.to.unwrap_or(today);
    let from = range.from.unwrap_or_else(|| to - chrono::Days::new(30));
    format!("{kind}-{from}_{to}.csv")
}

#[utoipa::path(
    get,
    path = "/reports/dashboard",
    tag = "reports",
    summary = "Dashboard counters",
    responses((status = 200, description = "Counters for the home screen", body = DashboardResponse)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn dashboard(State(state): State<AppState>, user: CurrentUser) -> Result<Json<DashboardResponse>> {
    permissions::require(&user, Resource::Company, Operation::Read)?;
    let today = Utc::now().date_naive();
    let (start, end) = DateRange {
        from: Some(today),
        to: Some(today),
    }
    .bounds(today)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut reports = Reports::new(&mut tx, user.company_id);
    let active_repairs = reports.active_repairs_by_status().await?;
    let outstanding_balance = reports.outstanding_balance().await?;
    let low_stock_count = reports.low_stock_count().await?;
    let sales = reports.sales_totals(start, end).await?;
    let register_open = CashRegister::new(&mut tx, user.company_id).current().await?.is_some();
    let unread_notifications = Notifications::new(&mut tx, user.company_id).count_for(user.id, true).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(DashboardResponse {
        active_repair_count: active_repairs.iter().map(|s| s.count).sum(),
        active_repairs,
        outstanding_balance,
        low_stock_count,
        sales_today: sales.sale_count,
        sales_today_total: sales.total,
        register_open,
        unread_notifications,
    }))
}

#[utoipa::path(
    get,
    path = "/reports/sales-summary",
    tag = "reports",
    summary = "Sales summary",
    params(DateRange),
    responses(
        (status = 200, description = "Totals, per-method and per-day breakdown, top products", body = SalesSummaryResponse),
        (status = 400, description = "Invalid date range"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn sales_summary(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
    user: CurrentUser,
) -> Result<Json<SalesSummaryResponse>> {
    permissions::require(&user, Resource::Reports, Operation::Read)?;
    let (from, to) = range.bounds(Utc::now().date_naive())?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let mut reports = Reports::new(&mut tx, user.company_id);
    let totals = reports.sales_totals(from, to).await?;
    let by_method = reports.sales_by_method(from, to).await?;
    let by_day = reports.sales_by_day(from, to).await?;
    let top_products = reports.top_products(from, to).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SalesSummaryResponse {
        from,
        to,
        totals,
        by_method,
        by_day,
        top_products,
    }))
}

async fn load_liquidation(state: &AppState, user: &CurrentUser) -> Result<LiquidationReport> {
    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let rows = Reports::new(&mut tx, user.company_id).liquidation_rows().await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(LiquidationReport::build(rows))
}

/// Stock valued at cost and at retail, per product and per category.
#[utoipa::path(
    get,
    path = "/reports/liquidation",
    tag = "reports",
    summary = "Inventory liquidation report",
    responses((status = 200, description = "Products in stock with cost, retail and margin", body = LiquidationReport)),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn liquidation(State(state): State<AppState>, user: CurrentUser) -> Result<Json<LiquidationReport>> {
    permissions::require(&user, Resource::Reports, Operation::Read)?;
    Ok(Json(load_liquidation(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/reports/liquidation.csv",
    tag = "reports",
    summary = "Liquidation report as CSV",
    responses((status = 200, description = "CSV attachment", content_type = "text/csv")),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn liquidation_export(State(state): State<AppState>, user: CurrentUser) -> Result<Response> {
    permissions::require(&user, Resource::Reports, Operation::Read)?;
    let report = load_liquidation(&state, &user).await?;
    let body = liquidation_csv(&report)?;
    Ok(csv_response(format!("liquidation-{}.csv", Utc::now().date_naive()), body))
}

#[utoipa::path(
    get,
    path = "/reports/sales.csv",
    tag = "reports",
    summary = "Sales listing as CSV",
    params(DateRange),
    responses(
        (status = 200, description = "CSV attachment, completed and voided sales", content_type = "text/csv"),
        (status = 400, description = "Invalid date range"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn sales_export(State(state): State<AppState>, Query(range): Query<DateRange>, user: CurrentUser) -> Result<Response> {
    permissions::require(&user, Resource::Reports, Operation::Read)?;
    let today = Utc::now().date_naive();
    let (from, to) = range.bounds(today)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let sales = Reports::new(&mut tx, user.company_id).sales_for_export(from, to).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let body = sales_csv(&sales)?;
    Ok(csv_response(export_filename("sales", &range, today), body))
}

#[utoipa::path(
    get,
    path = "/reports/repairs.csv",
    tag = "reports",
    summary = "Repair orders as CSV",
    params(DateRange),
    responses(
        (status = 200, description = "CSV attachment of orders received in the range", content_type = "text/csv"),
        (status = 400, description = "Invalid date range"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn repairs_export(State(state): State<AppState>, Query(range): Query<DateRange>, user: CurrentUser) -> Result<Response> {
    permissions::require(&user, Resource::Reports, Operation::Read)?;
    let today = Utc::now().date_naive();
    let (from, to) = range.bounds(today)?;

    let mut tx = begin_scoped(&state.db, user.company_id).await?;
    let rows = Reports::new(&mut tx, user.company_id).repairs_for_export(from, to).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let body = repairs_csv(&rows)?;
    Ok(csv_response(export_filename("repairs", &range, today), body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::profiles::Role;
    use crate::test_utils::{bearer, create_test_config, create_test_server};
    use axum::http::StatusCode;

    #[test]
    fn filenames_name_the_covered_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            to: None,
        };
        assert_eq!(export_filename("sales", &range, today), "sales-2025-03-01_2025-03-31.csv");
        assert_eq!(
            export_filename("repairs", &DateRange::default(), today),
            "repairs-2025-03-01_2025-03-31.csv"
        );
    }

    #[test]
    fn csv_responses_are_attachments() {
        let response = csv_response("sales.csv".to_string(), b"a,b\n".to_vec());
        assert_eq!(response.headers()[header::CONTENT_TYPE], CSV_CONTENT_TYPE);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"sales.csv\""
        );
    }

    #[tokio::test]
    async fn technicians_cannot_export() {
        let config = create_test_config();
        let auth = bearer(&config, Role::Technician);
        let server = create_test_server(config);

        server
            .get("/api/v1/reports/sales.csv")
            .add_header("authorization", auth)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
