//! Database models for profiles.

use crate::api::models::profiles::{ProfileUpdate, Role};
use crate::types::{CompanyId, ProfileId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a profile. The password is hashed by the caller.
#[derive(Debug, Clone)]
pub struct ProfileCreateDBRequest {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateDBRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl From<ProfileUpdate> for ProfileUpdateDBRequest {
    fn from(api: ProfileUpdate) -> Self {
        Self {
            full_name: api.full_name,
            role: api.role,
            active: api.active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileDBResponse {
    pub id: ProfileId,
    pub company_id: CompanyId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: Option<String>,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
