//! API request and response models.
//!
//! Request bodies carry a `validate()` that rejects bad input before any database work; responses
//! are built from the database models with `From`. Everything here derives `utoipa::ToSchema` so
//! the OpenAPI document at `/docs` stays in step with the handlers.

use crate::errors::{Error, Result};

pub mod auth;
pub mod cash_register;
pub mod categories;
pub mod companies;
pub mod customers;
pub mod notes;
pub mod notifications;
pub mod pagination;
pub mod products;
pub mod profiles;
pub mod purchase_orders;
pub mod quotes;
pub mod repairs;
pub mod reports;
pub mod sales;
pub mod suppliers;
pub mod technicians;

/// Reject empty or whitespace-only required text.
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::bad_request(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected_with_field_name() {
        let err = require_text("Customer name", "  ").unwrap_err();
        assert_eq!(err.user_message(), "Customer name is required");
        assert!(require_text("Customer name", "Ana").is_ok());
    }
}
