//! Database record models.
//!
//! `*DBRequest` structs carry normalised input into a repository; `*DBResponse` structs derive
//! `sqlx::FromRow` and mirror a table row, sometimes widened with joined display columns such as
//! a customer or technician name. API models convert to and from these with `From`.

pub mod cash_register;
pub mod categories;
pub mod companies;
pub mod customers;
pub mod notes;
pub mod notifications;
pub mod products;
pub mod profiles;
pub mod purchase_orders;
pub mod quotes;
pub mod repairs;
pub mod reports;
pub mod sales;
pub mod suppliers;
pub mod technicians;

/// Trim optional free text, mapping blank strings to `None`.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::clean;

    #[test]
    fn clean_trims_and_drops_blanks() {
        assert_eq!(clean(Some("  hi ".to_string())), Some("hi".to_string()));
        assert_eq!(clean(Some("   ".to_string())), None);
        assert_eq!(clean(None), None);
    }
}
