//! `milestone-core`: shared building blocks for the command pipeline and the
//! goal domain.
//!
//! This crate holds **pure** primitives (identifiers, entity contract, domain
//! errors) and carries no transport or storage concerns.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{PrincipalId, RecordId};
