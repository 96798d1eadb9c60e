use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use milestone_auth::{authorize, Session, TokenError, TokenRegistry};

use crate::command::{Command, CommandKind};
use crate::failure::Failure;
use crate::middleware::{Middleware, Next};
use crate::policy::PolicySource;
use crate::response::Flow;

/// Checks the presented credential against the policy registered for the
/// command's kind.
///
/// - kind without a policy ⇒ `Forbidden` (deny by default)
/// - permission required, credential missing or not resolvable ⇒ `Unauthorized`
/// - credential resolved but permission not granted ⇒ `Forbidden`
///
/// On success the resolved session is attached to the command. When the policy
/// requires nothing, a valid credential is still attached and an invalid one is
/// ignored.
pub struct AuthorizationChecker {
    registry: Arc<dyn TokenRegistry>,
    policies: Arc<dyn PolicySource>,
}

impl AuthorizationChecker {
    pub fn new(registry: Arc<dyn TokenRegistry>, policies: Arc<dyn PolicySource>) -> Self {
        Self { registry, policies }
    }
}

impl<K: CommandKind> Middleware<K> for AuthorizationChecker {
    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        let policy = self
            .policies
            .policy_for(K::KIND)
            .ok_or_else(|| Failure::forbidden(format!("no access policy for '{}'", K::KIND)))?;

        match &policy.requires {
            Some(required) => {
                let session = resolve_session(self.registry.as_ref(), command)?;
                authorize(&session, required).map_err(|e| Failure::forbidden(e.to_string()))?;
                command.attach_session(session);
            }
            None => {
                if command.session().is_none() && command.credential().is_some() {
                    match resolve_session(self.registry.as_ref(), command) {
                        Ok(session) => command.attach_session(session),
                        Err(e) => debug!(kind = K::KIND, error = %e, "ignoring credential on public command"),
                    }
                }
            }
        }

        next.run(command)
    }
}

/// Session for the command's credential: the one already attached, or a fresh
/// lookup in `registry`.
pub(crate) fn resolve_session<K: CommandKind>(
    registry: &dyn TokenRegistry,
    command: &Command<K>,
) -> Result<Session, Failure> {
    if let Some(session) = command.session() {
        return Ok(session.clone());
    }

    let credential = command.credential().ok_or(Failure::Unauthorized)?;
    registry.resolve(credential.token(), Utc::now()).map_err(|e| match e {
        TokenError::Unavailable(detail) => Failure::unclassified(detail),
        other => {
            debug!(kind = K::KIND, error = %other, "credential rejected");
            Failure::Unauthorized
        }
    })
}
