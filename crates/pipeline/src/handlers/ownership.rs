use std::sync::Arc;

use tracing::debug;

use milestone_auth::TokenRegistry;

use crate::command::{Command, CommandKind};
use crate::failure::Failure;
use crate::handlers::resolve_session;
use crate::middleware::{Middleware, Next};
use crate::policy::PolicySource;
use crate::response::Flow;
use crate::validation::RecordStore;

/// For kinds whose policy requires ownership: the caller must own the record
/// the command targets.
///
/// The caller is resolved here if no earlier stage did it, so this stage
/// reports `Unauthorized` for a missing credential wherever it sits in the
/// chain. A target that does not exist is left to validation/execution.
pub struct OwnershipChecker {
    registry: Arc<dyn TokenRegistry>,
    policies: Arc<dyn PolicySource>,
    store: Arc<dyn RecordStore>,
}

impl OwnershipChecker {
    pub fn new(
        registry: Arc<dyn TokenRegistry>,
        policies: Arc<dyn PolicySource>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            registry,
            policies,
            store,
        }
    }
}

impl<K: CommandKind> Middleware<K> for OwnershipChecker {
    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        let required = self.policies.policy_for(K::KIND).is_some_and(|p| p.ownership);
        if !required {
            return next.run(command);
        }

        let session = resolve_session(self.registry.as_ref(), command)?;
        let principal = session.principal_id;
        command.attach_session(session);

        if let Some(target) = command.input().target() {
            match self.store.owner_of(target.collection, target.id)? {
                Some(owner) if owner != principal => {
                    return Err(Failure::forbidden(format!("not the owner of {target}")));
                }
                Some(_) => {}
                None => debug!(kind = K::KIND, %target, "ownership target missing; deferring"),
            }
        }

        next.run(command)
    }
}
