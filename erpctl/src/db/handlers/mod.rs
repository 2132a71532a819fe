//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (usually a transaction opened with
//! [`crate::db::begin_scoped`]) together with the tenant's company id, and every query it issues
//! filters on that company id in addition to the row-level security policy.
//!
//! Simple entity tables implement the shared [`Repository`] trait; workflow tables
//! (repair orders, sales, quotes, purchase orders, cash register) expose purpose-built methods
//! because their writes are always part of a larger transaction.
//!
//! ```ignore
//! use erpctl::db::handlers::{Customers, Repository};
//!
//! let mut tx = begin_scoped(&pool, company_id).await?;
//! let customer = Customers::new(&mut tx, company_id).create(&request).await?;
//! tx.commit().await?;
//! ```

use sqlx::{Postgres, QueryBuilder};

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
pub mod repair_orders;
pub mod reports;
pub mod repository;
pub mod sales;
pub mod suppliers;
pub mod technicians;

pub use cash_register::CashRegister;
pub use categories::Categories;
pub use companies::Companies;
pub use customers::Customers;
pub use notes::InternalNotes;
pub use notifications::Notifications;
pub use products::Products;
pub use profiles::Profiles;
pub use purchase_orders::PurchaseOrders;
pub use quotes::Quotes;
pub use repair_orders::RepairOrders;
pub use reports::Reports;
pub use repository::Repository;
pub use sales::Sales;
pub use suppliers::Suppliers;
pub use technicians::Technicians;

/// Case-insensitive substring match of `search` against any of `columns`.
pub(crate) fn push_search(query: &mut QueryBuilder<'_, Postgres>, columns: &[&str], search: Option<&str>) {
    let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return;
    };
    let pattern = format!("%{}%", search.to_lowercase());

    query.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        query.push(format!("LOWER(COALESCE({column}, '')) LIKE "));
        query.push_bind(pattern.clone());
    }
    query.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_any_column() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM t WHERE active");
        push_search(&mut query, &["name", "email"], Some("  Ana "));
        assert_eq!(
            query.sql(),
            "SELECT 1 FROM t WHERE active AND (LOWER(COALESCE(name, '')) LIKE $1 OR LOWER(COALESCE(email, '')) LIKE $2)"
        );
    }

    #[test]
    fn blank_search_adds_nothing() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1");
        push_search(&mut query, &["name"], Some("   "));
        push_search(&mut query, &["name"], None);
        assert_eq!(query.sql(), "SELECT 1");
    }
}
