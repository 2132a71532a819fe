//! Database repository for companies.
//!
//! Companies are the tenant root, so this repository is keyed by the company id itself rather
//! than constructed with one.

use crate::db::{
    errors::{DbError, Result},
    models::companies::{CompanyCreateDBRequest, CompanyDBResponse, CompanyUpdateDBRequest},
};
use crate::types::{CompanyId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Companies<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Companies<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    pub async fn create(&mut self, request: &CompanyCreateDBRequest) -> Result<CompanyDBResponse> {
        let company = sqlx::query_as::<_, CompanyDBResponse>(
            "INSERT INTO companies (name, email, currency) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(request.name.trim())
        .bind(&request.email)
        .bind(&request.currency)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(company)
    }

    /// Number of tenants. Runs outside any company scope, so RLS does not hide rows.
    #[instrument(skip(self), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    #[instrument(skip(self), fields(company_id = %abbrev_uuid(&id)), err)]
    pub async fn get(&mut self, id: CompanyId) -> Result<Option<CompanyDBResponse>> {
        let company = sqlx::query_as::<_, CompanyDBResponse>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(company)
    }

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&id)), err)]
    pub async fn update(&mut self, id: CompanyId, request: &CompanyUpdateDBRequest) -> Result<CompanyDBResponse> {
        let company = sqlx::query_as::<_, CompanyDBResponse>(
            r#"
            UPDATE companies SET
                name = COALESCE($2, name),
                tax_id = COALESCE($3, tax_id),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                currency = COALESCE($7, currency),
                tax_rate = COALESCE($8, tax_rate)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(&request.tax_id)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.currency)
        .bind(request.tax_rate)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(company)
    }
}
