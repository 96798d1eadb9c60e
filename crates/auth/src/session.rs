use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use milestone_core::PrincipalId;

use crate::Permission;

/// A resolved credential: who is calling and what they may do.
///
/// Sessions are produced by a [`crate::TokenRegistry`] and attached to a
/// command once a pipeline stage has resolved its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub principal_id: PrincipalId,
    pub permissions: Vec<Permission>,
    /// `None` means the session does not expire on its own (it can still be revoked).
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(principal_id: PrincipalId, permissions: Vec<Permission>) -> Self {
        Self {
            principal_id,
            permissions,
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn grants(&self, required: &Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| p.is_wildcard() || p.as_str() == required.as_str())
    }
}
