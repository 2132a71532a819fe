//! Database repository for product categories.

use crate::db::{
    errors::{DbError, Result},
    models::categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest},
};
use crate::types::{CategoryId, CompanyId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

const SELECT_WITH_COUNT: &str = r#"
    SELECT c.*,
        (SELECT COUNT(*) FROM products p
         WHERE p.category_id = c.id AND p.deleted_at IS NULL AND p.active) AS product_count
    FROM categories c
"#;

pub struct Categories<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Categories<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    pub async fn create(&mut self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse> {
        let category = sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            INSERT INTO categories (company_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *, 0::BIGINT AS product_count
            "#,
        )
        .bind(self.company_id)
        .bind(&request.name)
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(category)
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: CategoryId) -> Result<Option<CategoryDBResponse>> {
        let category = sqlx::query_as::<_, CategoryDBResponse>(&format!("{SELECT_WITH_COUNT} WHERE c.id = $1 AND c.company_id = $2"))
            .bind(id)
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(category)
    }

    /// Categories are few per company, so they are listed whole, alphabetically.
    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<CategoryDBResponse>> {
        let categories = sqlx::query_as::<_, CategoryDBResponse>(&format!("{SELECT_WITH_COUNT} WHERE c.company_id = $1 ORDER BY c.name"))
            .bind(self.company_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(categories)
    }

    #[instrument(skip(self, request), fields(category_id = %abbrev_uuid(&id)), err)]
    pub async fn update(&mut self, id: CategoryId, request: &CategoryUpdateDBRequest) -> Result<CategoryDBResponse> {
        let updated = sqlx::query(
            r#"
            UPDATE categories SET
                name = COALESCE($3, name),
                description = COALESCE($4, description)
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(id)
        .bind(self.company_id)
        .bind(&request.name)
        .bind(&request.description)
        .execute(&mut *self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    /// Products in the category become uncategorized.
    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
