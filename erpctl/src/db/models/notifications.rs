//! Database models for in-app notifications.

use crate::api::models::notifications::NotificationKind;
use crate::types::{CompanyId, NotificationId, ProfileId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NotificationCreateDBRequest {
    /// `None` addresses everyone in the company
    pub profile_id: Option<ProfileId>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub reference_id: Option<Uuid>,
}

impl NotificationCreateDBRequest {
    pub fn company_wide(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            profile_id: None,
            kind,
            title: title.into(),
            body: body.into(),
            reference_id: None,
        }
    }

    pub fn about(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationDBResponse {
    pub id: NotificationId,
    pub company_id: CompanyId,
    pub profile_id: Option<ProfileId>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub reference_id: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
