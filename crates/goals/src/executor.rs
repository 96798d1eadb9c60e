//! Terminal stage for every goal command kind.

use std::sync::Arc;

use tracing::info;

use milestone_core::{PrincipalId, RecordId};
use milestone_pipeline::{Command, CommandKind, Executor, Failure};

use crate::commands::{CreateGoal, DeleteGoal, ListGoals, UpdateGoal, ViewGoal};
use crate::goal::Goal;
use crate::store::GoalStore;

/// Performs goal actions against the store.
///
/// Runs only after authorization and validation passed, so the caller's
/// session is attached and required fields are present. Missing values are
/// still reported as failures rather than panics.
#[derive(Debug, Clone)]
pub struct GoalExecutor {
    store: Arc<GoalStore>,
}

impl GoalExecutor {
    pub fn new(store: Arc<GoalStore>) -> Self {
        Self { store }
    }
}

fn caller<K: CommandKind>(command: &Command<K>) -> Result<PrincipalId, Failure> {
    command
        .session()
        .map(|s| s.principal_id)
        .ok_or(Failure::Unauthorized)
}

fn record_id(id: Option<RecordId>) -> Result<RecordId, Failure> {
    id.ok_or_else(|| Failure::invalid("id", "presence", "can't be blank"))
}

impl Executor<CreateGoal> for GoalExecutor {
    fn execute(&self, command: &Command<CreateGoal>) -> Result<Option<Goal>, Failure> {
        let owner = caller(command)?;
        let goal = self.store.insert(owner, command.input().draft())?;
        info!(goal_id = %goal.id, %owner, "goal created");
        Ok(Some(goal))
    }
}

impl Executor<ViewGoal> for GoalExecutor {
    fn execute(&self, command: &Command<ViewGoal>) -> Result<Option<Goal>, Failure> {
        let id = record_id(command.input().id)?;
        Ok(Some(self.store.get(id)?))
    }
}

impl Executor<ListGoals> for GoalExecutor {
    fn execute(&self, command: &Command<ListGoals>) -> Result<Option<Vec<Goal>>, Failure> {
        let owner = caller(command)?;
        Ok(Some(self.store.list_by_owner(owner)?))
    }
}

impl Executor<UpdateGoal> for GoalExecutor {
    fn execute(&self, command: &Command<UpdateGoal>) -> Result<Option<Goal>, Failure> {
        let id = record_id(command.input().id)?;
        let goal = self.store.update(id, command.input().patch())?;
        info!(goal_id = %goal.id, "goal updated");
        Ok(Some(goal))
    }
}

impl Executor<DeleteGoal> for GoalExecutor {
    fn execute(&self, command: &Command<DeleteGoal>) -> Result<Option<()>, Failure> {
        let id = record_id(command.input().id)?;
        self.store.delete(id)?;
        info!(goal_id = %id, "goal deleted");
        Ok(None)
    }
}
