//! OpenAPI documentation for the HTTP API.
//!
//! [`ErpApiDoc`] covers `/authentication/*` and `/api/v1/*`. The JSON document is served at
//! `/openapi.json` and rendered with Scalar at `/docs`.

mod api;

pub use api::ErpApiDoc;
