//! Database repository for internal notes.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::{push_search, repository::Repository},
    models::notes::{InternalNoteCreateDBRequest, InternalNoteDBResponse, InternalNoteUpdateDBRequest},
};
use crate::types::{CompanyId, NoteId, abbrev_uuid};
use sqlx::{PgConnection, QueryBuilder};
use tracing::instrument;

const SEARCH_COLUMNS: &[&str] = &["n.title", "n.body"];

fn joined(source: &str) -> String {
    format!("SELECT n.*, p.full_name AS author_name FROM {source} n LEFT JOIN profiles p ON p.id = n.author_id")
}

/// Filter for listing notes
#[derive(Debug, Clone)]
pub struct NoteFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl NoteFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }
}

pub struct InternalNotes<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> InternalNotes<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    pub async fn count(&mut self, filter: &NoteFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM internal_notes n WHERE n.company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for InternalNotes<'c> {
    type CreateRequest = InternalNoteCreateDBRequest;
    type UpdateRequest = InternalNoteUpdateDBRequest;
    type Response = InternalNoteDBResponse;
    type Id = NoteId;
    type Filter = NoteFilter;

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&self.company_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO internal_notes (company_id, author_id, title, body, pinned)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            {}
            "#,
            joined("inserted")
        );
        let note = sqlx::query_as::<_, InternalNoteDBResponse>(&sql)
            .bind(self.company_id)
            .bind(request.author_id)
            .bind(&request.title)
            .bind(&request.body)
            .bind(request.pinned)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(note)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let note = sqlx::query_as::<_, InternalNoteDBResponse>(&format!("{} WHERE n.id = $1 AND n.company_id = $2", joined("internal_notes")))
            .bind(id)
            .bind(self.company_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(note)
    }

    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let notes = sqlx::query_as::<_, InternalNoteDBResponse>(&format!(
            "{} WHERE n.id = ANY($1) AND n.company_id = $2",
            joined("internal_notes")
        ))
        .bind(&ids)
        .bind(self.company_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(notes.into_iter().map(|n| (n.id, n)).collect())
    }

    /// Pinned notes first, then newest.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(joined("internal_notes"));
        query.push(" WHERE n.company_id = ");
        query.push_bind(self.company_id);
        push_search(&mut query, SEARCH_COLUMNS, filter.search.as_deref());
        query.push(" ORDER BY n.pinned DESC, n.updated_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let notes = query.build_query_as::<InternalNoteDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(notes)
    }

    #[instrument(skip(self), fields(note_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM internal_notes WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(self.company_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(note_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE internal_notes SET
                    title = COALESCE($3, title),
                    body = COALESCE($4, body),
                    pinned = COALESCE($5, pinned)
                WHERE id = $1 AND company_id = $2
                RETURNING *
            )
            {}
            "#,
            joined("updated")
        );
        let note = sqlx::query_as::<_, InternalNoteDBResponse>(&sql)
            .bind(id)
            .bind(self.company_id)
            .bind(&request.title)
            .bind(&request.body)
            .bind(request.pinned)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(note)
    }
}
