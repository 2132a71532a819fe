//! HTTP request handlers for all API endpoints.
//!
//! Handlers are organized by resource. Each one checks the caller's role against
//! [`crate::auth::permissions`] first, validates the body, then opens a company-scoped
//! transaction with [`crate::db::begin_scoped`] and works through the repositories in
//! [`crate::db::handlers`]. Multi-step operations (stock deduction with a sale, payment with a
//! status change) commit or roll back as one unit.
//!
//! # Handler Modules
//!
//! - [`auth`]: Login, logout and registration
//! - [`company`]: The caller's company settings
//! - [`profiles`]: Staff accounts and roles
//! - [`customers`], [`suppliers`], [`technicians`], [`categories`]: Master data CRUD
//! - [`products`]: Catalog, variants, stock adjustments and movement history
//! - [`repairs`]: Repair intake, workflow, parts, payments and order notes
//! - [`sales`]: Point of sale and voids
//! - [`quotes`]: Quotes and conversion into sales
//! - [`purchase_orders`]: Supplier orders and receiving
//! - [`cash_register`]: Shift open and close with reconciliation
//! - [`notes`]: Staff notice board
//! - [`notifications`]: In-app notifications
//! - [`reports`]: Dashboard, sales summary, liquidation report and CSV exports
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts into an HTTP status and a JSON
//! `{"error": ...}` body.

pub mod auth;
pub mod cash_register;
pub mod categories;
pub mod company;
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
