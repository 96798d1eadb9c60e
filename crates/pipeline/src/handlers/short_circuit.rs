use crate::command::{Command, CommandKind};
use crate::middleware::{Middleware, Next};
use crate::response::{Flow, Reply, Response};

/// Answers from `check` when it returns a response, skipping the rest of the
/// chain; otherwise delegates.
///
/// Useful for cached reads or a maintenance switch.
pub struct ShortCircuit<F> {
    name: &'static str,
    check: F,
}

impl<F> ShortCircuit<F> {
    pub fn new(name: &'static str, check: F) -> Self {
        Self { name, check }
    }
}

impl<K, F> Middleware<K> for ShortCircuit<F>
where
    K: CommandKind,
    F: Fn(&Command<K>) -> Option<Response> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        match (self.check)(command) {
            Some(response) => Ok(Reply::Rendered(response)),
            None => next.run(command),
        }
    }
}
