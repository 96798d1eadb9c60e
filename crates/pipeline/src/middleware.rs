use crate::command::{Command, CommandKind};
use crate::failure::Failure;
use crate::response::{Flow, Reply};

/// One non-terminal stage of a pipeline.
///
/// A stage may act before and/or after running `next`, replace the downstream
/// outcome, or return without running `next` at all (short-circuit). `Next` is
/// consumed when run, so the rest of the chain runs at most once per call.
///
/// Closures become middleware through [`from_fn`].
pub trait Middleware<K: CommandKind>: Send + Sync {
    /// Name used in logs and `Pipeline::stage_names`.
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow;
}

/// Wrap a closure as a middleware stage.
///
/// ```ignore
/// let stage = from_fn(|command: &mut Command<ViewGoal>, next: Next<'_, ViewGoal>| {
///     tracing::debug!(kind = command.kind(), "before");
///     next.run(command)
/// });
/// ```
pub fn from_fn<K, F>(f: F) -> FromFn<F>
where
    K: CommandKind,
    F: for<'a> Fn(&mut Command<K>, Next<'a, K>) -> Flow + Send + Sync,
{
    FromFn { f }
}

/// Middleware built by [`from_fn`].
pub struct FromFn<F> {
    f: F,
}

impl<K, F> Middleware<K> for FromFn<F>
where
    K: CommandKind,
    F: for<'a> Fn(&mut Command<K>, Next<'a, K>) -> Flow + Send + Sync,
{
    fn name(&self) -> &'static str {
        "from_fn"
    }

    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        (self.f)(command, next)
    }
}

/// The terminal stage: performs the business action.
///
/// Returns the result payload (`None` for actions without one). The executor
/// never delegates further.
pub trait Executor<K: CommandKind>: Send + Sync {
    fn execute(&self, command: &Command<K>) -> Result<Option<K::Output>, Failure>;
}

/// Executor built from a closure (see `PipelineBuilder::execute_fn`).
pub(crate) struct FnExecutor<F>(pub(crate) F);

impl<K, F> Executor<K> for FnExecutor<F>
where
    K: CommandKind,
    F: Fn(&Command<K>) -> Result<Option<K::Output>, Failure> + Send + Sync,
{
    fn execute(&self, command: &Command<K>) -> Result<Option<K::Output>, Failure> {
        (self.0)(command)
    }
}

/// The remainder of the chain after the current stage.
pub struct Next<'a, K: CommandKind> {
    stages: &'a [Box<dyn Middleware<K>>],
    executor: &'a dyn Executor<K>,
}

impl<'a, K: CommandKind> Next<'a, K> {
    pub(crate) fn new(stages: &'a [Box<dyn Middleware<K>>], executor: &'a dyn Executor<K>) -> Self {
        Self { stages, executor }
    }

    /// Number of middleware stages left before the executor.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    /// Run the rest of the chain (depth-first, on the calling thread).
    pub fn run(self, command: &mut Command<K>) -> Flow {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(command, Next::new(rest, self.executor)),
            None => execute_terminal(self.executor, command),
        }
    }
}

fn execute_terminal<K: CommandKind>(executor: &dyn Executor<K>, command: &mut Command<K>) -> Flow {
    if !command.errors().is_empty() {
        return Err(Failure::Validation(command.errors().clone()));
    }
    let output = executor.execute(command)?;
    command.complete(output)?;
    Ok(Reply::Pending)
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
