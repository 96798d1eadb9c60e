//! Authorization policy lookup keyed by command kind.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use milestone_auth::Permission;

/// Access policy for one command kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Permission the caller's credential must grant (`None`: no credential needed).
    #[serde(default)]
    pub requires: Option<Permission>,

    /// Whether the caller must own the record the command targets.
    #[serde(default)]
    pub ownership: bool,
}

impl Policy {
    /// Anyone may run the command.
    pub fn public() -> Self {
        Self::default()
    }

    pub fn requires(permission: impl Into<Permission>) -> Self {
        Self {
            requires: Some(permission.into()),
            ownership: false,
        }
    }

    pub fn with_ownership(mut self) -> Self {
        self.ownership = true;
        self
    }
}

/// Source of policies (a rules table, a config file, a remote service…).
pub trait PolicySource: Send + Sync {
    /// Policy registered for `kind`, or `None` when the kind is unknown.
    fn policy_for(&self, kind: &str) -> Option<Policy>;
}

impl<S> PolicySource for Arc<S>
where
    S: PolicySource + ?Sized,
{
    fn policy_for(&self, kind: &str) -> Option<Policy> {
        (**self).policy_for(kind)
    }
}

/// Static rules table.
///
/// Deserializes from a JSON object keyed by kind:
///
/// ```json
/// { "goals.view": { "requires": "goals.login", "ownership": true } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable {
    rules: HashMap<String, Policy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: impl Into<String>, policy: Policy) -> Self {
        self.insert(kind, policy);
        self
    }

    pub fn insert(&mut self, kind: impl Into<String>, policy: Policy) {
        self.rules.insert(kind.into(), policy);
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl PolicySource for PolicyTable {
    fn policy_for(&self, kind: &str) -> Option<Policy> {
        self.rules.get(kind).cloned()
    }
}
