//! Pipeline assembly and invocation.

use std::sync::Arc;

use milestone_auth::TokenRegistry;

use crate::command::{Command, CommandKind};
use crate::failure::Failure;
use crate::handlers::{
    AuthorizationChecker, ErrorTranslator, Instrument, OwnershipChecker, ResponseRenderer,
    ValidationChecker,
};
use crate::middleware::{Executor, FnExecutor, Middleware, Next};
use crate::policy::PolicySource;
use crate::response::Flow;
use crate::validation::RecordStore;

/// External collaborators the standard stages consult.
#[derive(Clone)]
pub struct Collaborators {
    pub tokens: Arc<dyn TokenRegistry>,
    pub policies: Arc<dyn PolicySource>,
    pub records: Arc<dyn RecordStore>,
}

impl Collaborators {
    pub fn new(
        tokens: Arc<dyn TokenRegistry>,
        policies: Arc<dyn PolicySource>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            tokens,
            policies,
            records,
        }
    }
}

/// Ordered middleware chain ending in exactly one executor.
///
/// Built once and reused: a pipeline holds no per-request state, so one
/// instance can serve concurrent requests (each `run` is an independent call
/// stack over its own command).
pub struct Pipeline<K: CommandKind> {
    stages: Vec<Box<dyn Middleware<K>>>,
    executor: Box<dyn Executor<K>>,
}

impl<K: CommandKind> Pipeline<K> {
    pub fn builder() -> PipelineBuilder<K> {
        PipelineBuilder { stages: Vec::new() }
    }

    /// Run `command` through the chain and hand it back with the outcome.
    ///
    /// Synchronous and depth-first: stage *i* runs stage *i+1* on this thread
    /// and waits for it. Nothing is retried.
    pub fn run(&self, mut command: Command<K>) -> (Command<K>, Flow) {
        let flow = Next::new(&self.stages, self.executor.as_ref()).run(&mut command);
        (command, flow)
    }

    /// Stage names, outermost first (the executor is not listed).
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl<K: CommandKind> core::fmt::Debug for Pipeline<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipeline")
            .field("kind", &K::KIND)
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for [`Pipeline`]. Finished only by supplying the executor, which
/// is therefore always the single, last stage.
pub struct PipelineBuilder<K: CommandKind> {
    stages: Vec<Box<dyn Middleware<K>>>,
}

impl<K: CommandKind> PipelineBuilder<K> {
    /// Append a stage (stages run in the order they are added).
    pub fn layer(mut self, stage: impl Middleware<K> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append the default stages:
    /// instrument → error translation → rendering → authorization →
    /// validation → ownership.
    pub fn standard(self, collaborators: &Collaborators) -> Self {
        let Collaborators {
            tokens,
            policies,
            records,
        } = collaborators.clone();

        self.layer(Instrument)
            .layer(ErrorTranslator)
            .layer(ResponseRenderer)
            .layer(AuthorizationChecker::new(tokens.clone(), policies.clone()))
            .layer(ValidationChecker::new(records.clone()))
            .layer(OwnershipChecker::new(tokens, policies, records))
    }

    pub fn execute(self, executor: impl Executor<K> + 'static) -> Pipeline<K> {
        Pipeline {
            stages: self.stages,
            executor: Box::new(executor),
        }
    }

    pub fn execute_fn<F>(self, f: F) -> Pipeline<K>
    where
        F: Fn(&Command<K>) -> Result<Option<K::Output>, Failure> + Send + Sync + 'static,
    {
        self.execute(FnExecutor(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Credential;
    use crate::fixtures::{login_session, Harness, Rename};
    use crate::handlers::OwnershipChecker;
    use crate::middleware::from_fn;
    use crate::response::{Reply, Response, Status};
    use milestone_core::{PrincipalId, RecordId};
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    #[test]
    fn stages_run_in_order_before_and_after_next() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let outer = trace.clone();
        let inner = trace.clone();

        let pipeline = Pipeline::<Rename>::builder()
            .layer(from_fn(move |cmd: &mut Command<Rename>, next: Next<'_, Rename>| {
                outer.lock().unwrap().push("outer:before");
                let flow = next.run(cmd);
                outer.lock().unwrap().push("outer:after");
                flow
            }))
            .layer(from_fn(move |cmd: &mut Command<Rename>, next: Next<'_, Rename>| {
                inner.lock().unwrap().push("inner:before");
                let flow = next.run(cmd);
                inner.lock().unwrap().push("inner:after");
                flow
            }))
            .execute_fn({
                let trace = trace.clone();
                move |_| {
                    trace.lock().unwrap().push("execute");
                    Ok(None)
                }
            });

        let (_cmd, flow) = pipeline.run(Command::new(Rename::new(1, "t"), None));

        assert_eq!(flow, Ok(Reply::Pending));
        assert_eq!(
            *trace.lock().unwrap(),
            vec!["outer:before", "inner:before", "execute", "inner:after", "outer:after"]
        );
    }

    #[test]
    fn stage_that_does_not_delegate_halts_the_chain() {
        let harness = Harness::new();
        let pipeline = Pipeline::<Rename>::builder()
            .layer(from_fn(|_cmd: &mut Command<Rename>, _next: Next<'_, Rename>| {
                Ok(Reply::Rendered(Response::no_content()))
            }))
            .execute(harness.executor());

        let (cmd, flow) = pipeline.run(Command::new(Rename::new(1, "t"), None));

        assert_eq!(flow.unwrap().response().map(|r| r.status), Some(Status::NoContent));
        assert!(!cmd.is_executed());
        assert_eq!(harness.executions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn standard_order_is_reported() {
        let harness = Harness::new();
        let pipeline = Pipeline::<Rename>::builder()
            .standard(&harness.collaborators())
            .execute(harness.executor());

        assert_eq!(
            pipeline.stage_names(),
            vec![
                "Instrument",
                "ErrorTranslator",
                "ResponseRenderer",
                "AuthorizationChecker",
                "ValidationChecker",
                "OwnershipChecker",
            ]
        );
    }

    #[test]
    fn standard_pipeline_renders_each_failure_category() {
        let harness = Harness::new();
        let owner = login_session();
        harness.records.put("notes", RecordId::new(1), owner.principal_id, "mine");
        let owner_token = harness.issue(owner);
        let stranger_token = harness.issue(login_session());
        let pipeline = Pipeline::<Rename>::builder()
            .standard(&harness.collaborators())
            .execute(harness.executor());

        let status = |cmd| pipeline.run(cmd).1.unwrap().into_response().unwrap().status;

        assert_eq!(status(Command::new(Rename::new(1, "ok title"), None)), Status::Unauthorized);
        assert_eq!(
            status(Command::new(Rename::new(1, "ok title"), Some(stranger_token))),
            Status::Forbidden
        );
        assert_eq!(
            status(Command::new(Rename::new(2, "ok title"), Some(owner_token.clone()))),
            Status::UnprocessableEntity
        );
        assert_eq!(status(Command::new(Rename::new(1, "ok title"), Some(owner_token))), Status::Ok);
    }

    #[test]
    fn unreadable_fields_are_authorized_before_they_are_reported() {
        let harness = Harness::new();
        let token = harness.issue(login_session());
        let pipeline = Pipeline::<Rename>::builder()
            .standard(&harness.collaborators())
            .execute(harness.executor());
        let malformed = || {
            let mut fields = crate::command::RawFields::new();
            fields.insert("id".to_string(), json!(1));
            fields.insert("extra".to_string(), json!(true));
            fields
        };

        let (_cmd, flow) = pipeline.run(Command::from_fields(malformed(), None));
        assert_eq!(flow.unwrap().response().map(|r| r.status), Some(Status::Unauthorized));

        let (cmd, flow) = pipeline.run(Command::from_fields(malformed(), Some(token)));
        let response = flow.unwrap().into_response().unwrap();
        assert_eq!(response.status, Status::UnprocessableEntity);
        assert_eq!(response.body.unwrap()["errors"]["extra"][0]["rule"], json!("schema"));
        assert!(!cmd.is_executed());
        assert_eq!(harness.executions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn executor_failure_is_rendered_as_500() {
        let harness = Harness::new();
        let token = harness.issue(login_session());
        let pipeline = Pipeline::<Rename>::builder()
            .layer(ErrorTranslator)
            .layer(ResponseRenderer)
            .layer(AuthorizationChecker::new(harness.tokens.clone(), harness.policies.clone()))
            .execute_fn(|_| Err(Failure::unclassified("disk on fire")));

        let (_cmd, flow) = pipeline.run(Command::new(Rename::new(1, "t"), Some(token)));
        let response = flow.unwrap().into_response().unwrap();

        assert_eq!(response.status, Status::InternalServerError);
        assert_eq!(response.body.unwrap()["message"], json!("internal server error"));
    }

    #[test]
    fn ownership_before_authorization_still_reports_unauthorized_first() {
        let harness = Harness::new();
        harness.records.put("notes", RecordId::new(1), PrincipalId::new(), "theirs");
        let collab = harness.collaborators();
        let pipeline = Pipeline::<Rename>::builder()
            .layer(ErrorTranslator)
            .layer(ResponseRenderer)
            .layer(OwnershipChecker::new(
                collab.tokens.clone(),
                collab.policies.clone(),
                collab.records.clone(),
            ))
            .layer(AuthorizationChecker::new(collab.tokens.clone(), collab.policies.clone()))
            .layer(ValidationChecker::new(collab.records.clone()))
            .execute(harness.executor());

        let (_cmd, flow) = pipeline.run(Command::new(Rename::new(1, "t"), None));
        assert_eq!(flow.unwrap().response().map(|r| r.status), Some(Status::Unauthorized));

        let (_cmd, flow) = pipeline.run(Command::new(Rename::new(1, "t"), Some(Credential::new("forged"))));
        assert_eq!(flow.unwrap().response().map(|r| r.status), Some(Status::Unauthorized));
        assert_eq!(harness.executions.load(Ordering::SeqCst), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: with valid input and credentials the pipeline's result is
        /// exactly what the executor returns when called directly.
        #[test]
        fn valid_commands_yield_the_executor_output(title in "[a-z]{2,40}") {
            let harness = Harness::new();
            let session = login_session();
            harness.records.put("notes", RecordId::new(1), session.principal_id, "seed");
            let token = harness.issue(session);
            let pipeline = Pipeline::<Rename>::builder()
                .standard(&harness.collaborators())
                .execute(harness.executor());

            let direct = harness.executor().execute(&Command::new(Rename::new(1, &title), None)).unwrap();
            let (cmd, flow) = pipeline.run(Command::new(Rename::new(1, &title), Some(token)));

            prop_assert_eq!(cmd.result(), direct.as_ref());
            let response = flow.unwrap().into_response().unwrap();
            prop_assert_eq!(response.body, direct.map(|t| json!(t)));
        }

        /// Property: the reported error set is the union of every failing rule,
        /// never just the first one.
        #[test]
        fn validation_reports_every_failing_rule(
            id in 2u64..1_000,
            title in prop_oneof![Just(String::new()), "[a-z]{41,60}", "[a-z]{2,40}"],
        ) {
            let harness = Harness::new();
            harness.records.put("notes", RecordId::new(1), PrincipalId::new(), "seed");
            let pipeline = Pipeline::<Rename>::builder()
                .layer(ValidationChecker::new(harness.records.clone()))
                .execute(harness.executor());

            let (_cmd, flow) = pipeline.run(Command::new(Rename::new(id, &title), None));
            let Err(Failure::Validation(errors)) = flow else {
                return Err(TestCaseError::fail("expected validation failure"));
            };

            prop_assert!(errors.has("id", "exists"));
            let expected_title_rules: Vec<&str> = match title.len() {
                0 => vec!["presence", "length"],
                n if n > 40 => vec!["length"],
                _ => vec![],
            };
            let title_rules: Vec<&str> = errors.get("title").iter().map(|v| v.rule.as_str()).collect();
            prop_assert_eq!(&title_rules, &expected_title_rules);
            prop_assert_eq!(errors.len(), 1 + expected_title_rules.len());
        }

        /// Property: structurally identical commands against unchanged state
        /// produce identical payloads.
        #[test]
        fn identical_commands_are_idempotent(title in "[a-z]{2,40}") {
            let harness = Harness::new();
            let session = login_session();
            harness.records.put("notes", RecordId::new(1), session.principal_id, "seed");
            let token = harness.issue(session);
            let pipeline = Pipeline::<Rename>::builder()
                .standard(&harness.collaborators())
                .execute(harness.executor());

            let (_a, first) = pipeline.run(Command::new(Rename::new(1, &title), Some(token.clone())));
            let (_b, second) = pipeline.run(Command::new(Rename::new(1, &title), Some(token)));
            prop_assert_eq!(first, second);
        }
    }
}
