use std::sync::Arc;

use crate::command::{Command, CommandKind};
use crate::failure::Failure;
use crate::middleware::{Middleware, Next};
use crate::response::Flow;
use crate::validation::RecordStore;

/// Evaluates the rules declared by the command's kind.
///
/// All rules run; if any failed, the chain stops with a `Validation` failure
/// carrying every violation recorded on the command. Unbound commands skip
/// the rules and fail with the `schema` violations they arrived with.
pub struct ValidationChecker {
    store: Arc<dyn RecordStore>,
}

impl ValidationChecker {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl<K: CommandKind> Middleware<K> for ValidationChecker {
    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        if command.is_bound() {
            let rules = command.input().rules();
            rules.evaluate(self.store.as_ref(), command.errors_mut())?;
        }

        if !command.errors().is_empty() {
            return Err(Failure::Validation(command.errors().clone()));
        }
        next.run(command)
    }
}
