//! Database repository for profiles.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::{push_search, repository::Repository},
    models::profiles::{ProfileCreateDBRequest, ProfileDBResponse, ProfileUpdateDBRequest},
};
use crate::types::{CompanyId, ProfileId, abbrev_uuid};
use sqlx::{PgConnection, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["full_name", "email"];

/// Filter for listing profiles
#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl ProfileFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }
}

pub struct Profiles<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Profiles<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    /// Look a profile up by email across all companies. Only used to sign in, before a tenant is
    /// known; emails are globally unique.
    #[instrument(skip(db, email), err)]
    pub async fn get_by_email(db: &mut PgConnection, email: &str) -> Result<Option<ProfileDBResponse>> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>("SELECT * FROM profiles WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&mut *db)
            .await?;

        Ok(profile)
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&id)), err)]
    pub async fn touch_last_login(&mut self, id: ProfileId) -> Result<()> {
        sqlx::query("UPDATE profiles SET last_login = now() WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ProfileFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM profiles WHERE company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Profiles<'c> {
    type CreateRequest = ProfileCreateDBRequest;
    type UpdateRequest = ProfileUpdateDBRequest;
    type Response = ProfileDBResponse;
    type Id = ProfileId;
    type Filter = ProfileFilter;

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&self.company_id), role = %request.role), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(
            r#"
            INSERT INTO profiles (company_id, email, full_name, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(self.company_id)
        .bind(request.email.trim().to_lowercase())
        .bind(request.full_name.trim())
        .bind(request.role)
        .bind(&request.password_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(profile)
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>("SELECT * FROM profiles WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(profile)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let profiles = sqlx::query_as::<_, ProfileDBResponse>("SELECT * FROM profiles WHERE id = ANY($1) AND company_id = $2")
            .bind(&ids)
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM profiles WHERE company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query.push(" ORDER BY full_name LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let profiles = query.build_query_as::<ProfileDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(profiles)
    }

    /// Profiles own history (orders, payments, notes), so removal deactivates.
    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("UPDATE profiles SET active = false WHERE id = $1 AND company_id = $2 AND active")
            .bind(id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(profile_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(
            r#"
            UPDATE profiles SET
                full_name = COALESCE($3, full_name),
                role = COALESCE($4, role),
                active = COALESCE($5, active)
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.company_id)
        .bind(request.full_name.as_deref().map(str::trim))
        .bind(request.role)
        .bind(request.active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(profile)
    }
}
