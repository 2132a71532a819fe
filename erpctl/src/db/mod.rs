//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │  begin_scoped(pool, company_id)
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries, stock and numbering rules)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │  (row-level security on company_id)
//! └─────────────┘
//! ```
//!
//! # Tenancy
//!
//! Every tenant-owned table carries `company_id` and has a `tenant_isolation` RLS policy keyed on
//! the transaction-local setting `app.current_company_id`. [`begin_scoped`] opens a transaction
//! with that setting applied, and every repository is constructed with the same company id and
//! filters on it explicitly, so a query that forgets its predicate is still confined by the
//! policy. Connections that never set the variable (login, registration, bootstrap,
//! migrations) see all rows.
//!
//! ## Example Usage
//!
//! ```ignore
//! use erpctl::db::{begin_scoped, handlers::{Customers, Repository}};
//!
//! let mut tx = begin_scoped(&pool, user.company_id).await?;
//! let customer = Customers::new(&mut tx, user.company_id).create(&request).await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/` directory.
//! The [`crate::migrator`] function provides access to the migrator:
//!
//! ```ignore
//! erpctl::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;

use std::time::Duration;

use sqlx::{
    PgPool, Postgres, Transaction,
    postgres::PgPoolOptions,
};

use crate::config::DatabaseConfig;
use crate::types::CompanyId;
use errors::Result;

/// Build the connection pool from configuration without connecting.
///
/// Connections are opened on first use, so startup fails at the first query (migrations)
/// rather than here.
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    let settings = &config.pool;
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
}

/// Begin a transaction whose row-level-security scope is `company_id`.
///
/// The setting is transaction-local (`set_config(..., true)`), so it is discarded on commit or
/// rollback and never leaks to the next user of the pooled connection.
pub async fn begin_scoped(pool: &PgPool, company_id: CompanyId) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT set_config('app.current_company_id', $1, true)")
        .bind(company_id.to_string())
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
