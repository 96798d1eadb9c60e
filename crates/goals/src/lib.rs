//! `milestone-goals`: goal tracking on top of the command pipeline.
//!
//! Users own goals; every operation is a command kind run through the standard
//! pipeline (authorization, validation, ownership) by [`GoalService`].

pub mod commands;
pub mod executor;
pub mod goal;
pub mod policy;
pub mod service;
pub mod store;

pub use commands::{CreateGoal, DeleteGoal, ListGoals, UpdateGoal, ViewGoal};
pub use executor::GoalExecutor;
pub use goal::{Goal, GoalDraft, GoalPatch};
pub use policy::{default_policies, LOGIN};
pub use service::GoalService;
pub use store::GoalStore;
