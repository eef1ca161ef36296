//! `stardust-auth` — authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer turns a bearer token into
//! a [`Principal`], the workflow service checks roles with [`authorize`].

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod roles;

pub use authorize::{authorize, authorize_any, AuthzError, Principal};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
