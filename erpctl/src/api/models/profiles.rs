//! API request/response models for profiles (the people who sign in).

use super::pagination::Pagination;
use super::require_text;
use crate::errors::{Error, Result};
use crate::db::models::profiles::ProfileDBResponse;
use crate::types::{CompanyId, ProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// What a profile may do inside its company. See [`crate::auth::permissions`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Staff,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Technician => "technician",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileCreate {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    /// Initial password; the profile cannot sign in until one is set
    pub password: Option<String>,
}

impl ProfileCreate {
    pub fn validate(&self) -> Result<()> {
        require_text("Full name", &self.full_name)?;
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(Error::bad_request(format!("Invalid email address: {email}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.full_name {
            Some(name) => require_text("Full name", name),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProfileId,
    #[schema(value_type = String, format = "uuid")]
    pub company_id: CompanyId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileDBResponse> for ProfileResponse {
    fn from(db: ProfileDBResponse) -> Self {
        Self {
            id: db.id,
            company_id: db.company_id,
            email: db.email,
            full_name: db.full_name,
            role: db.role,
            active: db.active,
            last_login: db.last_login,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProfilesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name or email
    pub search: Option<String>,
}

/// The authenticated caller, as decoded from the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProfileId,
    #[schema(value_type = String, format = "uuid")]
    pub company_id: CompanyId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<ProfileDBResponse> for CurrentUser {
    fn from(db: ProfileDBResponse) -> Self {
        Self {
            id: db.id,
            company_id: db.company_id,
            email: db.email,
            full_name: db.full_name,
            role: db.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(email: &str) -> ProfileCreate {
        ProfileCreate {
            email: email.to_string(),
            full_name: "Luis".to_string(),
            role: Role::Staff,
            password: None,
        }
    }

    #[test]
    fn create_requires_plausible_email() {
        assert!(create("luis@shop.example").validate().is_ok());
        assert!(create("luis").validate().is_err());
        assert!(create("@shop.example").validate().is_err());
        assert!(create("luis@localhost").validate().is_err());
    }

    #[test]
    fn roles_round_trip_as_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Technician).unwrap(), "\"technician\"");
        assert_eq!(Role::Owner.to_string(), "owner");
    }
}
