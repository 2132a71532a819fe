//! API request/response models for the tenant company.

use super::require_text;
use crate::db::models::companies::CompanyDBResponse;
use crate::errors::{Error, Result};
use crate::types::CompanyId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// ISO 4217 code, e.g. `USD`
    pub currency: Option<String>,
    /// Default tax rate in percent for new sales and quotes
    #[schema(value_type = Option<String>)]
    pub tax_rate: Option<Decimal>,
}

impl CompanyUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_text("Company name", name)?;
        }
        if let Some(currency) = &self.currency
            && (currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(Error::bad_request("Currency must be a three-letter ISO code"));
        }
        if let Some(rate) = self.tax_rate
            && (rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED)
        {
            return Err(Error::bad_request("Tax rate must be between 0 and 100"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CompanyId,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency: String,
    #[schema(value_type = String)]
    pub tax_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CompanyDBResponse> for CompanyResponse {
    fn from(db: CompanyDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            tax_id: db.tax_id,
            email: db.email,
            phone: db.phone,
            address: db.address,
            currency: db.currency,
            tax_rate: db.tax_rate,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_validation() {
        assert!(CompanyUpdate::default().validate().is_ok());

        let bad_currency = CompanyUpdate {
            currency: Some("US".into()),
            ..Default::default()
        };
        assert!(bad_currency.validate().is_err());

        let bad_rate = CompanyUpdate {
            tax_rate: Some(Decimal::from(101)),
            ..Default::default()
        };
        assert!(bad_rate.validate().is_err());

        let blank_name = CompanyUpdate {
            name: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(blank_name.validate().unwrap_err().user_message(), "Company name is required");
    }
}
