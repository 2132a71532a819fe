//! API request/response models for technicians.

use super::pagination::Pagination;
use super::require_text;
use crate::db::models::technicians::TechnicianDBResponse;
use crate::errors::Result;
use crate::types::{ProfileId, TechnicianId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TechnicianCreate {
    pub name: String,
    /// Link to a sign-in profile, if the technician uses the system
    #[schema(value_type = Option<String>, format = "uuid")]
    pub profile_id: Option<ProfileId>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
}

impl TechnicianCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Technician name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TechnicianUpdate {
    pub name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub profile_id: Option<ProfileId>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub active: Option<bool>,
}

impl TechnicianUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) => require_text("Technician name", name),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TechnicianResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TechnicianId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub profile_id: Option<ProfileId>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TechnicianDBResponse> for TechnicianResponse {
    fn from(db: TechnicianDBResponse) -> Self {
        Self {
            id: db.id,
            profile_id: db.profile_id,
            name: db.name,
            email: db.email,
            phone: db.phone,
            specialty: db.specialty,
            active: db.active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListTechniciansQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub search: Option<String>,

    /// Include deactivated technicians (default: false)
    #[serde(default)]
    #[serde_as(as = "DisplayFromStr")]
    pub include_inactive: bool,
}
