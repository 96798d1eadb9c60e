//! `milestone-pipeline`: command/middleware execution pipeline.
//!
//! A [`Command`] is run through an ordered chain of [`Middleware`] stages that
//! ends in exactly one [`Executor`]:
//!
//! ```text
//! Command
//!   ↓
//! ErrorTranslator    (failures → responses)
//!   ↓
//! ResponseRenderer   (result → 200 / 204)
//!   ↓
//! AuthorizationChecker
//!   ↓
//! ValidationChecker
//!   ↓
//! OwnershipChecker
//!   ↓
//! Executor           (business action, terminal)
//! ```
//!
//! Every stage returns a [`Flow`]; there is no unwinding. A stage that returns
//! without running its [`Next`] halts the chain.

pub mod command;
pub mod failure;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod policy;
pub mod response;
pub mod validation;

#[cfg(test)]
mod fixtures;

pub use command::{Command, CommandKind, Credential, RawFields, ResourceRef, Submission};
pub use failure::Failure;
pub use handlers::{
    AuthorizationChecker, ErrorTranslator, Instrument, OwnershipChecker, ResponseRenderer,
    ShortCircuit, ValidationChecker,
};
pub use middleware::{from_fn, Executor, FromFn, Middleware, Next};
pub use pipeline::{Collaborators, Pipeline, PipelineBuilder};
pub use policy::{Policy, PolicySource, PolicyTable};
pub use response::{Flow, Reply, Response, Status};
pub use validation::{FieldRule, FieldValue, RecordStore, Rule, RuleSet, ValidationErrors, Violation};
