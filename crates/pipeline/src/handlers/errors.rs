use tracing::{error, info, warn};

use crate::command::{Command, CommandKind};
use crate::failure::Failure;
use crate::middleware::{Middleware, Next};
use crate::response::{Flow, Reply};

/// Outermost stage: turns every failure from the inner chain into a response.
///
/// Nothing below this stage can make a failure escape the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

impl<K: CommandKind> Middleware<K> for ErrorTranslator {
    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        let failure = match next.run(command) {
            Ok(reply) => return Ok(reply),
            Err(failure) => failure,
        };

        let principal = command.session().map(|s| s.principal_id.to_string());
        match &failure {
            Failure::Unclassified(detail) => {
                error!(kind = K::KIND, principal = ?principal, error = %detail, "command failed");
            }
            Failure::Validation(errors) => {
                info!(kind = K::KIND, principal = ?principal, violations = errors.len(), "command rejected by validation");
            }
            Failure::Unauthorized | Failure::Forbidden(_) => {
                warn!(kind = K::KIND, principal = ?principal, reason = %failure, "command denied");
            }
        }

        Ok(Reply::Rendered(failure.to_response()))
    }
}
