//! Database repository for customers.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::{push_search, repository::Repository},
    models::customers::{CustomerCreateDBRequest, CustomerDBResponse, CustomerUpdateDBRequest},
};
use crate::types::{CompanyId, CustomerId, abbrev_uuid};
use sqlx::{PgConnection, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "email", "phone", "document_id"];

/// Filter for listing customers
#[derive(Debug, Clone)]
pub struct CustomerFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl CustomerFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }
}

pub struct Customers<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Customers<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &CustomerFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM customers WHERE deleted_at IS NULL AND company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Customers<'c> {
    type CreateRequest = CustomerCreateDBRequest;
    type UpdateRequest = CustomerUpdateDBRequest;
    type Response = CustomerDBResponse;
    type Id = CustomerId;
    type Filter = CustomerFilter;

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&self.company_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            INSERT INTO customers (company_id, name, email, phone, document_id, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(self.company_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.document_id)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(customer)
    }

    #[instrument(skip(self), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            "SELECT * FROM customers WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(customer)
    }

    /// Includes soft-deleted customers, so historical documents still resolve their names.
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let customers = sqlx::query_as::<_, CustomerDBResponse>("SELECT * FROM customers WHERE id = ANY($1) AND company_id = $2")
            .bind(&ids)
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(customers.into_iter().map(|c| (c.id, c)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM customers WHERE deleted_at IS NULL AND company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query.push(" ORDER BY name, created_at LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let customers = query.build_query_as::<CustomerDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(customers)
    }

    /// Soft delete; repair orders and sales keep pointing at the row.
    #[instrument(skip(self), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE customers SET deleted_at = now() WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(self.company_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            UPDATE customers SET
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                document_id = COALESCE($6, document_id),
                address = COALESCE($7, address),
                notes = COALESCE($8, notes)
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.company_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.document_id)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(customer)
    }
}
