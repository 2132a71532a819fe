//! Authentication and authorization.
//!
//! # Authentication
//!
//! Profiles sign in with email and password at `/authentication/login` (or create a company at
//! `/authentication/register` when registration is enabled). Passwords are hashed with Argon2id.
//! A successful sign-in returns a signed JWT carrying the profile id, company id, email and role:
//!
//! - browsers get it as an HTTP-only session cookie;
//! - API clients send it as `Authorization: Bearer <token>`.
//!
//! Sessions are stateless; logout clears the cookie and the token expires after
//! `auth.security.jwt_expiry`.
//!
//! # Authorization
//!
//! Each profile has one [`Role`](crate::api::models::profiles::Role). Handlers call
//! [`permissions::require`] with the [`Resource`](crate::types::Resource) and
//! [`Operation`](crate::types::Operation) they are about to perform. Tenant isolation is separate
//! from roles: the company id in the token scopes every repository and database transaction.
//!
//! # Modules
//!
//! - [`current_user`]: `CurrentUser` extractor for handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: The role matrix
//! - [`session`]: JWT creation, verification and session cookies
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use erpctl::api::models::profiles::CurrentUser;
//! use erpctl::auth::permissions;
//!
//! async fn list_customers(State(state): State<AppState>, user: CurrentUser) -> Result<Json<...>> {
//!     permissions::require(&user, Resource::Customers, Operation::Read)?;
//!     let mut tx = begin_scoped(&state.db, user.company_id).await?;
//!     ...
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
