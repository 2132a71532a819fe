//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): Login, logout, registration, password change
//! - **Company & staff** (`/api/v1/company`, `/api/v1/profiles/*`)
//! - **Master data** (`/api/v1/customers/*`, `/api/v1/suppliers/*`, `/api/v1/technicians/*`,
//!   `/api/v1/categories/*`, `/api/v1/products/*`)
//! - **Repairs** (`/api/v1/repairs/*`): Intake, workflow, parts, payments
//! - **Documents** (`/api/v1/sales/*`, `/api/v1/quotes/*`, `/api/v1/purchase-orders/*`)
//! - **Cash register** (`/api/v1/cash-register/*`)
//! - **Notes & notifications** (`/api/v1/notes/*`, `/api/v1/notifications/*`)
//! - **Reports** (`/api/v1/reports/*`): Dashboard, sales summary, liquidation, CSV exports
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The rendered reference is served at `/docs`.

pub mod handlers;
pub mod models;
