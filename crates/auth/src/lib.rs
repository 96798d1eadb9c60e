//! `milestone-auth`: credential resolution and permission checks.
//!
//! This crate is intentionally decoupled from HTTP and from the pipeline: the
//! pipeline's authorization and ownership stages consume it through the
//! [`TokenRegistry`] trait and the [`authorize`] function.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod registry;
pub mod session;

pub use authorize::{authorize, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use permissions::Permission;
pub use registry::{InMemoryTokenRegistry, JwtTokenRegistry, TokenError, TokenRegistry};
pub use session::Session;
