//! Database repository for suppliers.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::{push_search, repository::Repository},
    models::suppliers::{SupplierCreateDBRequest, SupplierDBResponse, SupplierUpdateDBRequest},
};
use crate::types::{CompanyId, SupplierId, abbrev_uuid};
use sqlx::{PgConnection, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["name", "contact_name", "email", "phone"];

/// Filter for listing suppliers
#[derive(Debug, Clone)]
pub struct SupplierFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl SupplierFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }
}

pub struct Suppliers<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Suppliers<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &SupplierFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM suppliers WHERE deleted_at IS NULL AND company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Suppliers<'c> {
    type CreateRequest = SupplierCreateDBRequest;
    type UpdateRequest = SupplierUpdateDBRequest;
    type Response = SupplierDBResponse;
    type Id = SupplierId;
    type Filter = SupplierFilter;

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&self.company_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, SupplierDBResponse>(
            r#"
            INSERT INTO suppliers (company_id, name, contact_name, email, phone, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(self.company_id)
        .bind(&request.name)
        .bind(&request.contact_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(customer)
    }

    #[instrument(skip(self), fields(supplier_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let customer = sqlx::query_as::<_, SupplierDBResponse>(
            "SELECT * FROM suppliers WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(self.company_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(customer)
    }

        #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let suppliers = sqlx::query_as::<_, SupplierDBResponse>("SELECT * FROM suppliers WHERE id = ANY($1) AND company_id = $2")
            .bind(&ids)
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(suppliers.into_iter().map(|c| (c.id, c)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM suppliers WHERE deleted_at IS NULL AND company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query.push(" ORDER BY name, created_at LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let suppliers = query.build_query_as::<SupplierDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(suppliers)
    }

    /// Soft delete; purchase orders keep pointing at the row.
    #[instrument(skip(self), fields(supplier_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE suppliers SET deleted_at = now() WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(self.company_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(supplier_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, SupplierDBResponse>(
            r#"
            UPDATE suppliers SET
                name = COALESCE($3, name),
                contact_name = COALESCE($4, contact_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                notes = COALESCE($8, notes)
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.company_id)
        .bind(&request.name)
        .bind(&request.contact_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(customer)
    }
}
