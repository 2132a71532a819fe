//! API request/response models for quotes (estimates).

use super::pagination::Pagination;
use super::require_text;
use crate::cash::PaymentMethod;
use crate::db::models::quotes::{QuoteDBResponse, QuoteItemDBResponse};
use crate::errors::{Error, Result};
use crate::totals::{check_amount, check_quantity, check_tax_rate};
use crate::types::{CustomerId, ProductId, ProfileId, QuoteId, SaleId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
    /// Turned into a sale; final
    Converted,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
            QuoteStatus::Converted => "converted",
        }
    }

    /// Manual status changes. `converted` is only reached through conversion.
    pub fn check_transition(self, to: QuoteStatus) -> Result<()> {
        if self == QuoteStatus::Converted {
            return Err(Error::bad_request("Quote has already been converted to a sale"));
        }
        if to == QuoteStatus::Converted {
            return Err(Error::bad_request("Use the convert endpoint to turn a quote into a sale"));
        }
        if self == to {
            return Err(Error::bad_request(format!("Quote is already {to}")));
        }
        Ok(())
    }

    pub fn can_convert(self) -> Result<()> {
        match self {
            QuoteStatus::Draft | QuoteStatus::Sent | QuoteStatus::Accepted => Ok(()),
            other => Err(Error::bad_request(format!("Quote is {other} and cannot be converted to a sale"))),
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quoted line. With a `product_id`, description and price default to the product's.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteItemCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub product_id: Option<ProductId>,
    pub description: Option<String>,
    pub quantity: i32,
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub customer_id: Option<CustomerId>,
    pub valid_until: Option<NaiveDate>,
    pub items: Vec<QuoteItemCreate>,
    #[schema(value_type = Option<String>)]
    pub discount: Option<Decimal>,
    /// Percent; defaults to the company's tax rate
    #[schema(value_type = Option<String>)]
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
}

impl QuoteCreate {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::bad_request("A quote needs at least one item"));
        }
        for item in &self.items {
            check_quantity(item.quantity)?;
            if let Some(price) = item.unit_price {
                check_amount("Unit price", price)?;
            }
            if item.product_id.is_none() {
                match &item.description {
                    Some(description) => require_text("Item description", description)?,
                    None => return Err(Error::bad_request("Item needs a product or a description")),
                }
                if item.unit_price.is_none() {
                    return Err(Error::bad_request("Unit price is required for items without a product"));
                }
            }
        }
        if let Some(discount) = self.discount {
            check_amount("Discount", discount)?;
        }
        if let Some(rate) = self.tax_rate {
            check_tax_rate(rate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteStatusRequest {
    pub status: QuoteStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertQuoteRequest {
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: QuoteId,
    pub quote_number: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub status: QuoteStatus,
    pub valid_until: Option<NaiveDate>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub tax_rate: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub notes: Option<String>,
    /// Sale created from this quote
    #[schema(value_type = Option<String>, format = "uuid")]
    pub sale_id: Option<SaleId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub created_by: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QuoteDBResponse> for QuoteResponse {
    fn from(db: QuoteDBResponse) -> Self {
        Self {
            id: db.id,
            quote_number: db.quote_number,
            customer_id: db.customer_id,
            customer_name: db.customer_name,
            status: db.status,
            valid_until: db.valid_until,
            subtotal: db.subtotal,
            discount: db.discount,
            tax_rate: db.tax_rate,
            tax: db.tax,
            total: db.total,
            notes: db.notes,
            sale_id: db.sale_id,
            created_by: db.created_by,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl From<QuoteItemDBResponse> for QuoteItemResponse {
    fn from(db: QuoteItemDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            description: db.description,
            quantity: db.quantity,
            unit_price: db.unit_price,
            line_total: db.line_total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteDetail {
    #[serde(flatten)]
    pub quote: QuoteResponse,
    pub items: Vec<QuoteItemResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuotesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on quote number or customer name
    pub search: Option<String>,

    pub status: Option<QuoteStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converted_quotes_are_final() {
        for to in [QuoteStatus::Draft, QuoteStatus::Sent, QuoteStatus::Rejected] {
            assert!(QuoteStatus::Converted.check_transition(to).is_err());
        }
        assert!(QuoteStatus::Converted.can_convert().is_err());
    }

    #[test]
    fn converted_is_not_set_by_hand() {
        assert!(QuoteStatus::Accepted.check_transition(QuoteStatus::Converted).is_err());
        assert!(QuoteStatus::Draft.check_transition(QuoteStatus::Sent).is_ok());
        assert!(QuoteStatus::Rejected.check_transition(QuoteStatus::Draft).is_ok());
    }

    #[test]
    fn only_open_quotes_convert() {
        assert!(QuoteStatus::Sent.can_convert().is_ok());
        assert!(QuoteStatus::Accepted.can_convert().is_ok());
        let err = QuoteStatus::Expired.can_convert().unwrap_err();
        assert_eq!(err.user_message(), "Quote is expired and cannot be converted to a sale");
    }
}
