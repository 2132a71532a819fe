//! # erpctl: back office for repair shops
//!
//! `erpctl` is a multi-tenant ERP backend for small electronics repair businesses. Each company
//! (tenant) runs its repair desk, point of sale, quotes, purchasing, inventory and cash register
//! through one REST API.
//!
//! ## Overview
//!
//! A customer brings in a device and a repair order is opened with a sequential number
//! (`OR-000042`). The order moves through the repair workflow, parts are reserved and then
//! deducted from stock as they are used, and payments are taken against the order total until it
//! is paid in full. The same stock feeds the point of sale, and supplier purchase orders refill
//! it. At the end of a shift the cash register is closed and the counted cash is reconciled
//! against the float plus every cash sale and cash repair payment taken since opening.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence.
//!
//! ### Request Flow
//!
//! A request to `/api/v1/*` is authenticated by the [`CurrentUser`](api::models::profiles::CurrentUser)
//! extractor (bearer token or session cookie), checked against the role matrix in
//! [`auth::permissions`], then handled inside one company-scoped transaction opened with
//! [`db::begin_scoped`]. Row-level security on `company_id` backs up the explicit tenant filter
//! every repository applies. Multi-step operations (a sale and its stock deduction, a payment and
//! the resulting status change) commit together or not at all.
//!
//! ### Core Components
//!
//! - [`api`]: HTTP handlers and request/response models
//! - [`auth`]: Password hashing, JWT sessions, the role matrix
//! - [`db`]: Repositories over PostgreSQL, migrations, tenant scoping
//! - [`repairs`], [`inventory`], [`cash`], [`totals`], [`sequences`]: Domain rules that do not
//!   depend on HTTP (status transitions, stock arithmetic, reconciliation, document totals,
//!   order numbering)
//! - [`exports`]: CSV rendering for reports
//! - [`notifications`]: Background delivery of customer emails
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use erpctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = erpctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     erpctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations are embedded and run on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! erpctl::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod cash;
pub mod config;
pub mod db;
mod email;
pub mod errors;
pub mod exports;
pub mod inventory;
pub mod notifications;
mod openapi;
pub mod repairs;
pub mod sequences;
pub mod telemetry;
pub mod totals;
pub mod types;

#[cfg(test)]
pub mod test_utils;

#[cfg(all(test, feature = "db-tests"))]
mod test;

use crate::{
    api::models::profiles::Role,
    auth::password,
    config::CorsOrigin,
    db::{
        handlers::{Companies, Profiles, Repository},
        models::{companies::CompanyCreateDBRequest, profiles::ProfileCreateDBRequest},
    },
    notifications::{NotificationDispatcher, Notifier},
    openapi::ErpApiDoc,
};
use anyhow::Context;
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{delete, get, patch, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{CompanyId, ProfileId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .notifier(notifier)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Queue for customer emails; disabled unless `notifications.repair_emails` is on
    #[builder(default = Notifier::disabled())]
    pub notifier: Notifier,
}

/// Get the erpctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the configured first company and its owner.
///
/// Runs only when `bootstrap` is configured and no company exists yet, so restarting with the
/// same configuration never creates a second tenant or resets the owner's password.
///
/// Returns the id of the company it created, if any.
#[instrument(skip_all)]
pub async fn bootstrap_company(config: &Config, db: &PgPool) -> anyhow::Result<Option<CompanyId>> {
    let Some(bootstrap) = &config.bootstrap else {
        return Ok(None);
    };

    let mut tx = db.begin().await?;
    if Companies::new(&mut tx).count().await? > 0 {
        debug!("Companies already exist, skipping bootstrap");
        return Ok(None);
    }

    let owner_password = bootstrap
        .owner_password
        .clone()
        .context("bootstrap.owner_password is required to create the owner account")?;
    let password_hash = password::hash_password(owner_password, (&config.auth.password).into()).await?;
    let email = bootstrap.owner_email.trim().to_lowercase();

    let company = Companies::new(&mut tx)
        .create(&CompanyCreateDBRequest::new(bootstrap.company_name.trim(), Some(email.clone())))
        .await?;
    let owner = Profiles::new(&mut tx, company.id)
        .create(&ProfileCreateDBRequest {
            email,
            full_name: bootstrap.owner_name.clone().unwrap_or_else(|| "Owner".to_string()),
            role: Role::Owner,
            password_hash: Some(password_hash),
        })
        .await?;
    tx.commit().await?;

    info!(company_id = %company.id, owner_id = %owner.id, "Created bootstrap company");
    Ok(Some(company.id))
}

/// Connect, migrate and bootstrap.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = db::pool_options(&config.database)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to the database")?;
    migrator().run(&pool).await?;
    bootstrap_company(config, &pool).await?;
    Ok(pool)
}

/// Create CORS layer from configuration. No configured origins means no CORS layer.
fn create_cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    let cors_config = &config.auth.security.cors;
    if cors_config.allowed_origins.is_empty() {
        return Ok(None);
    }

    let mut origins = Vec::new();
    for origin in &cors_config.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials)
        .expose_headers([http::header::CONTENT_DISPOSITION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(Some(cors))
}

/// Routes under `/api/v1`.
fn api_routes() -> Router<AppState> {
    use api::handlers::{
        cash_register, categories, company, customers, notes, notifications, products, profiles, purchase_orders, quotes,
        repairs, reports, sales, suppliers, technicians,
    };

    Router::new()
        // Company and staff
        .route("/me", get(company::get_me))
        .route("/company", get(company::get_company).patch(company::update_company))
        .route("/profiles", get(profiles::list_profiles).post(profiles::create_profile))
        .route("/profiles/{id}", patch(profiles::update_profile))
        // Master data
        .route("/customers", get(customers::list_customers).post(customers::create_customer))
        .route(
            "/customers/{id}",
            get(customers::get_customer)
                .patch(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/suppliers", get(suppliers::list_suppliers).post(suppliers::create_supplier))
        .route(
            "/suppliers/{id}",
            get(suppliers::get_supplier)
                .patch(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route("/technicians", get(technicians::list_technicians).post(technicians::create_technician))
        .route(
            "/technicians/{id}",
            get(technicians::get_technician)
                .patch(technicians::update_technician)
                .delete(technicians::delete_technician),
        )
        .route("/categories", get(categories::list_categories).post(categories::create_category))
        .route(
            "/categories/{id}",
            patch(categories::update_category).delete(categories::delete_category),
        )
        // Inventory
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/low-stock", get(products::list_low_stock))
        .route(
            "/products/{id}",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/{id}/movements", get(products::list_movements))
        .route("/products/{id}/stock-adjustments", post(products::adjust_stock))
        .route("/products/{id}/variants", get(products::list_variants).post(products::create_variant))
        .route("/products/{id}/variants/{variant_id}", delete(products::delete_variant))
        // Repairs
        .route("/repairs", get(repairs::list_repairs).post(repairs::create_repair))
        .route("/repairs/{id}", get(repairs::get_repair).patch(repairs::update_repair))
        .route("/repairs/{id}/status", post(repairs::change_status))
        .route("/repairs/{id}/cancel", post(repairs::cancel_repair))
        .route("/repairs/{id}/items", post(repairs::add_item))
        .route("/repairs/{id}/items/{item_id}", delete(repairs::delete_item))
        .route("/repairs/{id}/items/{item_id}/use", post(repairs::use_item))
        .route("/repairs/{id}/reverse-stock", post(repairs::reverse_stock))
        .route("/repairs/{id}/payments", get(repairs::list_payments).post(repairs::add_payment))
        .route("/repairs/{id}/notes", get(repairs::list_notes).post(repairs::add_note))
        .route("/repairs/{id}/notes/{note_id}", delete(repairs::delete_note))
        // Documents
        .route("/sales", get(sales::list_sales).post(sales::create_sale))
        .route("/sales/{id}", get(sales::get_sale))
        .route("/sales/{id}/void", post(sales::void_sale))
        .route("/quotes", get(quotes::list_quotes).post(quotes::create_quote))
        .route("/quotes/{id}", get(quotes::get_quote))
        .route("/quotes/{id}/status", post(quotes::change_quote_status))
        .route("/quotes/{id}/convert", post(quotes::convert_quote))
        .route(
            "/purchase-orders",
            get(purchase_orders::list_purchase_orders).post(purchase_orders::create_purchase_order),
        )
        .route("/purchase-orders/{id}", get(purchase_orders::get_purchase_order))
        .route("/purchase-orders/{id}/order", post(purchase_orders::mark_ordered))
        .route("/purchase-orders/{id}/receive", post(purchase_orders::receive_purchase_order))
        .route("/purchase-orders/{id}/cancel", post(purchase_orders::cancel_purchase_order))
        // Cash register
        .route("/cash-register/current", get(cash_register::current_register))
        .route("/cash-register/open", post(cash_register::open_register))
        .route("/cash-register/close", post(cash_register::close_register))
        .route("/cash-register/closures", get(cash_register::list_closures))
        // Notes and notifications
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/{id}", patch(notes::update_note).delete(notes::delete_note))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        // Reports
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/reports/sales-summary", get(reports::sales_summary))
        .route("/reports/liquidation", get(reports::liquidation))
        .route("/reports/liquidation.csv", get(reports::liquidation_export))
        .route("/reports/sales.csv", get(reports::sales_export))
        .route("/reports/repairs.csv", get(reports::repairs_export))
}

/// Build the main application router with all endpoints and middleware.
///
/// - `/healthz` liveness probe
/// - `/authentication/*` login, registration and logout
/// - `/api/v1/*` the management API
/// - `/openapi.json` and the Scalar reference at `/docs`
/// - `/internal/metrics` when `enable_metrics` is set
///
/// CORS (when origins are configured) and HTTP tracing wrap everything.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::auth;

    let auth_routes = Router::new()
        .route("/authentication/register", post(auth::register))
        .route("/authentication/login", post(auth::login))
        .route("/authentication/logout", post(auth::logout));

    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes())
        .with_state(state)
        .route("/openapi.json", get(|| async { Json(ErpApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ErpApiDoc::openapi()));

    if let Some(cors) = cors_layer {
        router = router.layer(cors);
    }

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(move || async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Container for background services and their lifecycle management.
///
/// Today this is the notification dispatcher, which sends customer emails queued by request
/// handlers. The `drop_guard` cancels the shutdown token when dropped, so tasks stop even if
/// [`shutdown`](BackgroundServices::shutdown) is never called.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

fn setup_background_services(dispatcher: Option<NotificationDispatcher>, shutdown_token: CancellationToken) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    if let Some(dispatcher) = dispatcher {
        let token = shutdown_token.clone();
        background_tasks.push(tokio::spawn(dispatcher.run(token)));
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects, runs migrations, creates the bootstrap company
///    and starts background services
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal resolves, drains the notification queue and closes
///    the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Like [`Application::new`], reusing an existing pool when one is given (tests).
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting erpctl with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => {
                migrator().run(&pool).await?;
                bootstrap_company(&config, &pool).await?;
                pool
            }
            None => setup_database(&config).await?,
        };

        let shutdown_token = CancellationToken::new();
        let (notifier, dispatcher) = NotificationDispatcher::from_config(&config);
        let bg_services = setup_background_services(dispatcher, shutdown_token);

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .notifier(notifier)
            .build();
        let router = build_router(app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "erpctl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Stopping background services...");
        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsConfig;
    use crate::test_utils::{bearer, create_test_config, create_test_server};
    use axum::http::StatusCode;
    use url::Url;

    #[tokio::test]
    async fn healthz_answers_without_a_session() {
        let server = create_test_server(create_test_config());
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let server = create_test_server(create_test_config());

        let response = server.get("/openapi.json").await;
        response.assert_status_ok();
        let doc = response.json::<serde_json::Value>();
        assert_eq!(doc["info"]["title"], "erpctl API");
        assert!(doc["paths"]["/api/v1/sales/{id}/void"].is_object());

        server.get("/docs").await.assert_status_ok();
    }

    #[tokio::test]
    async fn api_routes_require_a_session() {
        let server = create_test_server(create_test_config());

        let response = server.get("/api/v1/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.json::<serde_json::Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn invalid_bearer_token_is_rejected() {
        let server = create_test_server(create_test_config());

        let response = server
            .get("/api/v1/customers")
            .add_header("authorization", "Bearer not-a-jwt")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<serde_json::Value>()["error"],
            "Session is invalid or has expired"
        );
    }

    #[tokio::test]
    async fn sessions_from_another_key_are_rejected() {
        let config = create_test_config();
        let mut other = config.clone();
        other.secret_key = Some("another-secret-key".to_string());
        let auth = bearer(&other, Role::Owner);
        let server = create_test_server(config);

        server
            .get("/api/v1/reports/dashboard")
            .add_header("authorization", auth)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let server = create_test_server(create_test_config());
        server.get("/api/v1/widgets").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[test]
    fn cors_is_off_without_origins() {
        let config = create_test_config();
        assert!(create_cors_layer(&config).unwrap().is_none());
    }

    #[test]
    fn cors_accepts_configured_origins() {
        let mut config = create_test_config();
        config.auth.security.cors = CorsConfig {
            allowed_origins: vec![CorsOrigin::Url(Url::parse("https://shop.example.com/").unwrap())],
            allow_credentials: true,
            max_age: Some(600),
        };
        assert!(create_cors_layer(&config).unwrap().is_some());
    }

    #[tokio::test]
    async fn background_services_stop_on_shutdown() {
        let token = CancellationToken::new();
        let services = setup_background_services(None, token.clone());
        services.shutdown().await;
        assert!(token.is_cancelled());
    }
}
