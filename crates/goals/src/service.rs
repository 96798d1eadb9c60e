//! Goal service: one standard pipeline per goal command kind.
//!
//! Transports hand a [`Submission`] and an optional credential to
//! [`GoalService`] and get a finished [`Response`] back. Every outcome,
//! including unreadable input, goes through the pipeline's own stages.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::error;

use milestone_auth::TokenRegistry;
use milestone_pipeline::{
    Collaborators, Command, CommandKind, Credential, Executor, Failure, Pipeline, PolicySource,
    Reply, Response, Submission,
};

use crate::commands::{CreateGoal, DeleteGoal, ListGoals, UpdateGoal, ViewGoal};
use crate::executor::GoalExecutor;
use crate::policy::default_policies;
use crate::store::GoalStore;

pub struct GoalService {
    store: Arc<GoalStore>,
    create: Pipeline<CreateGoal>,
    view: Pipeline<ViewGoal>,
    list: Pipeline<ListGoals>,
    update: Pipeline<UpdateGoal>,
    delete: Pipeline<DeleteGoal>,
}

impl GoalService {
    /// Service over an empty store with the default goal policies.
    pub fn new(tokens: Arc<dyn TokenRegistry>) -> Self {
        Self::with_parts(Arc::new(GoalStore::new()), tokens, Arc::new(default_policies()))
    }

    pub fn with_parts(
        store: Arc<GoalStore>,
        tokens: Arc<dyn TokenRegistry>,
        policies: Arc<dyn PolicySource>,
    ) -> Self {
        let collaborators = Collaborators::new(tokens, policies, store.clone());
        let executor = GoalExecutor::new(store.clone());

        Self {
            create: standard(&collaborators, executor.clone()),
            view: standard(&collaborators, executor.clone()),
            list: standard(&collaborators, executor.clone()),
            update: standard(&collaborators, executor.clone()),
            delete: standard(&collaborators, executor),
            store,
        }
    }

    pub fn store(&self) -> &Arc<GoalStore> {
        &self.store
    }

    pub fn create(&self, input: impl Into<Submission>, credential: Option<Credential>) -> Response {
        dispatch(&self.create, input.into(), credential)
    }

    pub fn view(&self, input: impl Into<Submission>, credential: Option<Credential>) -> Response {
        dispatch(&self.view, input.into(), credential)
    }

    pub fn list(&self, input: impl Into<Submission>, credential: Option<Credential>) -> Response {
        dispatch(&self.list, input.into(), credential)
    }

    pub fn update(&self, input: impl Into<Submission>, credential: Option<Credential>) -> Response {
        dispatch(&self.update, input.into(), credential)
    }

    pub fn delete(&self, input: impl Into<Submission>, credential: Option<Credential>) -> Response {
        dispatch(&self.delete, input.into(), credential)
    }
}

impl core::fmt::Debug for GoalService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GoalService")
            .field("create", &self.create)
            .field("view", &self.view)
            .field("list", &self.list)
            .field("update", &self.update)
            .field("delete", &self.delete)
            .finish_non_exhaustive()
    }
}

fn standard<K>(collaborators: &Collaborators, executor: GoalExecutor) -> Pipeline<K>
where
    K: CommandKind,
    GoalExecutor: Executor<K>,
{
    Pipeline::builder().standard(collaborators).execute(executor)
}

fn dispatch<K>(pipeline: &Pipeline<K>, input: Submission, credential: Option<Credential>) -> Response
where
    K: CommandKind + DeserializeOwned + Default,
{
    let command = Command::<K>::from_submission(input, credential);

    match pipeline.run(command).1 {
        Ok(Reply::Rendered(response)) => response,
        // Only reachable for pipelines assembled without the rendering stages.
        Ok(Reply::Pending) => {
            error!(kind = K::KIND, "pipeline finished without a response");
            Failure::unclassified("unrendered result").to_response()
        }
        Err(failure) => {
            error!(kind = K::KIND, error = %failure, "failure escaped the pipeline");
            failure.to_response()
        }
    }
}
