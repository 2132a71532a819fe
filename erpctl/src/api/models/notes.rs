//! API request/response models for internal notes (the shared staff notice board).

use super::pagination::Pagination;
use super::require_text;
use crate::db::models::notes::InternalNoteDBResponse;
use crate::errors::Result;
use crate::types::{NoteId, ProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InternalNoteCreate {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub pinned: bool,
}

impl InternalNoteCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Note title", &self.title)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InternalNoteUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

impl InternalNoteUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Some(title) => require_text("Note title", title),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InternalNoteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NoteId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub author_id: Option<ProfileId>,
    pub author_name: Option<String>,
    pub title: String,
    pub body: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InternalNoteDBResponse> for InternalNoteResponse {
    fn from(db: InternalNoteDBResponse) -> Self {
        Self {
            id: db.id,
            author_id: db.author_id,
            author_name: db.author_name,
            title: db.title,
            body: db.body,
            pinned: db.pinned,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on title or body
    pub search: Option<String>,
}
