//! Database models for internal notes.

use crate::api::models::notes::{InternalNoteCreate, InternalNoteUpdate};
use crate::types::{CompanyId, NoteId, ProfileId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct InternalNoteCreateDBRequest {
    pub author_id: ProfileId,
    pub title: String,
    pub body: String,
    pub pinned: bool,
}

impl InternalNoteCreateDBRequest {
    pub fn new(author_id: ProfileId, api: InternalNoteCreate) -> Self {
        Self {
            author_id,
            title: api.title.trim().to_string(),
            body: api.body,
            pinned: api.pinned,
        }
    }
}

/// Unlike other updates, an empty `body` is kept: it clears the note's text.
#[derive(Debug, Clone, Default)]
pub struct InternalNoteUpdateDBRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

impl From<InternalNoteUpdate> for InternalNoteUpdateDBRequest {
    fn from(api: InternalNoteUpdate) -> Self {
        Self {
            title: api.title.map(|t| t.trim().to_string()),
            body: api.body,
            pinned: api.pinned,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InternalNoteDBResponse {
    pub id: NoteId,
    pub company_id: CompanyId,
    pub author_id: Option<ProfileId>,
    pub author_name: Option<String>,
    pub title: String,
    pub body: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
