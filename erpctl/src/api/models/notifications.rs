//! API models for in-app notifications.

use super::pagination::Pagination;
use crate::db::models::notifications::NotificationDBResponse;
use crate::types::{NotificationId, ProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RepairStatus,
    LowStock,
    PurchaseReceived,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NotificationId,
    /// Recipient; absent for company-wide notifications
    #[schema(value_type = Option<String>, format = "uuid")]
    pub profile_id: Option<ProfileId>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Repair order, product or purchase order the notification is about
    #[schema(value_type = Option<String>, format = "uuid")]
    pub reference_id: Option<Uuid>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationDBResponse> for NotificationResponse {
    fn from(db: NotificationDBResponse) -> Self {
        Self {
            id: db.id,
            profile_id: db.profile_id,
            kind: db.kind,
            title: db.title,
            body: db.body,
            reference_id: db.reference_id,
            read: db.read_at.is_some(),
            read_at: db.read_at,
            created_at: db.created_at,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde(default)]
    #[serde_as(as = "DisplayFromStr")]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
