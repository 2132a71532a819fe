//! Database models for technicians.

use super::clean;
use crate::api::models::technicians::{TechnicianCreate, TechnicianUpdate};
use crate::types::{CompanyId, ProfileId, TechnicianId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct TechnicianCreateDBRequest {
    pub profile_id: Option<ProfileId>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
}

impl From<TechnicianCreate> for TechnicianCreateDBRequest {
    fn from(api: TechnicianCreate) -> Self {
        Self {
            profile_id: api.profile_id,
            name: api.name.trim().to_string(),
            email: clean(api.email).map(|e| e.to_lowercase()),
            phone: clean(api.phone),
            specialty: clean(api.specialty),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TechnicianUpdateDBRequest {
    pub profile_id: Option<ProfileId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub active: Option<bool>,
}

impl From<TechnicianUpdate> for TechnicianUpdateDBRequest {
    fn from(api: TechnicianUpdate) -> Self {
        Self {
            profile_id: api.profile_id,
            name: clean(api.name),
            email: clean(api.email).map(|e| e.to_lowercase()),
            phone: clean(api.phone),
            specialty: clean(api.specialty),
            active: api.active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TechnicianDBResponse {
    pub id: TechnicianId,
    pub company_id: CompanyId,
    pub profile_id: Option<ProfileId>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
