//! Test utilities shared by unit tests and the database-backed suite.

use crate::{
    AppState, Application, BackgroundServices,
    api::models::profiles::{CurrentUser, Role},
    auth::session,
    config::{Config, DatabaseConfig, EmailTransportConfig, PasswordConfig, PoolSettings},
    db::{
        handlers::{Companies, Profiles, Repository},
        models::{companies::CompanyCreateDBRequest, profiles::ProfileCreateDBRequest},
    },
};
use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("erpctl-test-emails-{}", std::process::id()));

    let mut config = Config {
        database: DatabaseConfig {
            // Only the db-tests suite connects; everything else gets a lazy pool that is never used
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/erpctl_test".to_string()),
            pool: PoolSettings {
                max_connections: 2,
                min_connections: 0,
                ..Default::default()
            },
        },
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        enable_metrics: false,
        ..Default::default()
    };
    config.auth.allow_registration = true;
    config.auth.session.cookie_secure = false;
    // Cheap hashing keeps the suite fast
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config.email.transport = EmailTransportConfig::File {
        path: temp_dir.to_string_lossy().into_owned(),
    };
    config.notifications.repair_emails = true;
    config
}

/// State over a lazy pool. Requests that reach the database fail; everything before that works.
pub fn create_test_state() -> AppState {
    create_test_state_with(create_test_config())
}

pub fn create_test_state_with(config: Config) -> AppState {
    let pool = crate::db::pool_options(&config.database)
        .connect_lazy(&config.database.url)
        .expect("Failed to create lazy pool");
    AppState::builder().db(pool).config(config).build()
}

/// Router over a lazy pool, for tests of authentication, permissions and validation.
pub fn create_test_server(config: Config) -> TestServer {
    let router = crate::build_router(create_test_state_with(config)).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Full application over a real database (migrated by `#[sqlx::test]`).
pub async fn create_test_app(pool: PgPool) -> (TestServer, BackgroundServices) {
    create_test_app_with(pool, create_test_config()).await
}

pub async fn create_test_app_with(pool: PgPool, config: Config) -> (TestServer, BackgroundServices) {
    Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// A session for a profile that only exists in the token.
pub fn test_user(role: Role) -> CurrentUser {
    CurrentUser {
        id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        email: format!("{}@example.com", role.as_str()),
        full_name: format!("Test {}", role.as_str()),
        role,
    }
}

/// `Authorization` header value for `user`.
pub fn bearer_for(config: &Config, user: &CurrentUser) -> String {
    let token = session::create_session_token(user, config).expect("Failed to create session token");
    format!("Bearer {token}")
}

/// `Authorization` header value for a fresh profile with `role`.
pub fn bearer(config: &Config, role: Role) -> String {
    bearer_for(config, &test_user(role))
}

/// Create a company and its owner directly in the database.
pub async fn create_test_company(pool: &PgPool, name: &str) -> CurrentUser {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let company = Companies::new(&mut tx)
        .create(&CompanyCreateDBRequest::new(name, None))
        .await
        .expect("Failed to create test company");
    let owner = Profiles::new(&mut tx, company.id)
        .create(&ProfileCreateDBRequest {
            email: format!("owner-{}@example.com", Uuid::new_v4().simple()),
            full_name: format!("{name} Owner"),
            role: Role::Owner,
            password_hash: None,
        })
        .await
        .expect("Failed to create test owner");
    tx.commit().await.expect("Failed to commit transaction");
    CurrentUser::from(owner)
}

/// Add a profile with `role` to the owner's company.
pub async fn create_test_profile(pool: &PgPool, owner: &CurrentUser, role: Role) -> CurrentUser {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let profile = Profiles::new(&mut tx, owner.company_id)
        .create(&ProfileCreateDBRequest {
            email: format!("{}-{}@example.com", role.as_str(), Uuid::new_v4().simple()),
            full_name: format!("Test {}", role.as_str()),
            role,
            password_hash: None,
        })
        .await
        .expect("Failed to create test profile");
    tx.commit().await.expect("Failed to commit transaction");
    CurrentUser::from(profile)
}
