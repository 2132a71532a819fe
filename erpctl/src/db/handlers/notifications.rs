//! Database repository for in-app notifications.
//!
//! A profile sees notifications addressed to it plus company-wide ones (`profile_id IS NULL`).
//! Company-wide notifications carry a single read marker, shared by everyone.

use crate::db::{
    errors::Result,
    models::notifications::{NotificationCreateDBRequest, NotificationDBResponse},
};
use crate::types::{CompanyId, NotificationId, ProfileId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Notifications<'c> {
    db: &'c mut PgConnection,
    company_id: CompanyId,
}

impl<'c> Notifications<'c> {
    pub fn new(db: &'c mut PgConnection, company_id: CompanyId) -> Self {
        Self { db, company_id }
    }

    #[instrument(skip(self, request), fields(kind = ?request.kind), err)]
    pub async fn create(&mut self, request: &NotificationCreateDBRequest) -> Result<NotificationDBResponse> {
        let notification = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            INSERT INTO notifications (company_id, profile_id, kind, title, body, reference_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(self.company_id)
        .bind(request.profile_id)
        .bind(request.kind)
        .bind(&request.title)
        .bind(&request.body)
        .bind(request.reference_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(notification)
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&profile_id)), err)]
    pub async fn list_for(&mut self, profile_id: ProfileId, unread_only: bool, skip: i64, limit: i64) -> Result<Vec<NotificationDBResponse>> {
        let notifications = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            SELECT * FROM notifications
            WHERE company_id = $1 AND (profile_id = $2 OR profile_id IS NULL)
              AND (NOT $3 OR read_at IS NULL)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(self.company_id)
        .bind(profile_id)
        .bind(unread_only)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(notifications)
    }

    pub async fn count_for(&mut self, profile_id: ProfileId, unread_only: bool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE company_id = $1 AND (profile_id = $2 OR profile_id IS NULL)
              AND (NOT $3 OR read_at IS NULL)
            "#,
        )
        .bind(self.company_id)
        .bind(profile_id)
        .bind(unread_only)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    /// Idempotent. Returns false if the notification is missing or not visible to the profile.
    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_read(&mut self, id: NotificationId, profile_id: ProfileId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, now())
            WHERE id = $1 AND company_id = $2 AND (profile_id = $3 OR profile_id IS NULL)
            "#,
        )
        .bind(id)
        .bind(self.company_id)
        .bind(profile_id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&profile_id)), err)]
    pub async fn mark_all_read(&mut self, profile_id: ProfileId) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read_at = now()
            WHERE company_id = $1 AND (profile_id = $2 OR profile_id IS NULL) AND read_at IS NULL
            "#,
        )
        .bind(self.company_id)
        .bind(profile_id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected())
    }
}
