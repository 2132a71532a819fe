//! Database repository for technicians.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::{push_search, repository::Repository},
    models::technicians::{TechnicianCreateDBRequest, TechnicianDBResponse, TechnicianUpdateDBRequest},
};
use crate::types::{CompanyId, TechnicianId, abbrev_uuid};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "email", "specialty"];

/// Filter for listing technicians
#[derive(Debug, Clone)]
pub struct TechnicianFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl TechnicianFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
            include_inactive: false,
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }
}

pub struct Technicians<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Technicians<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    fn filtered<'q>(&self, select: &str, filter: &'q TechnicianFilter) -> QueryBuilder<'q, Postgres> {
        let mut query = QueryBuilder::new(select);
        query.push(" FROM technicians WHERE company_id = ");
        query.push_bind(self.company_id);
        if !filter.include_inactive {
            query.push(" AND active");
        }
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &TechnicianFilter) -> Result<i64> {
        let mut query = self.filtered("SELECT COUNT(*)", filter);
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Technicians<'c> {
    type CreateRequest = TechnicianCreateDBRequest;
    type UpdateRequest = TechnicianUpdateDBRequest;
    type Response = TechnicianDBResponse;
    type Id = TechnicianId;
    type Filter = TechnicianFilter;

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&self.company_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let technician = sqlx::query_as::<_, TechnicianDBResponse>(
            r#"
            INSERT INTO technicians (company_id, profile_id, name, email, phone, specialty)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(self.company_id)
        .bind(request.profile_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.specialty)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(technician)
    }

    #[instrument(skip(self), fields(technician_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let technician = sqlx::query_as::<_, TechnicianDBResponse>("SELECT * FROM technicians WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(technician)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let technicians = sqlx::query_as::<_, TechnicianDBResponse>("SELECT * FROM technicians WHERE id = ANY($1) AND company_id = $2")
            .bind(&ids)
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(technicians.into_iter().map(|t| (t.id, t)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = self.filtered("SELECT *", filter);
        query.push(" ORDER BY name LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let technicians = query.build_query_as::<TechnicianDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(technicians)
    }

    /// Deactivates; assigned repair orders keep their technician.
    #[instrument(skip(self), fields(technician_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("UPDATE technicians SET active = false WHERE id = $1 AND company_id = $2 AND active")
            .bind(id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(technician_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let technician = sqlx::query_as::<_, TechnicianDBResponse>(
            r#"
            UPDATE technicians SET
                profile_id = COALESCE($3, profile_id),
                name = COALESCE($4, name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                specialty = COALESCE($7, specialty),
                active = COALESCE($8, active)
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.company_id)
        .bind(request.profile_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.specialty)
        .bind(request.active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(technician)
    }
}
