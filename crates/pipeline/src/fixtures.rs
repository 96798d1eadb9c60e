//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use milestone_auth::{InMemoryTokenRegistry, Permission, Session};
use milestone_core::{DomainError, PrincipalId, RecordId};

use crate::command::{Command, CommandKind, Credential, ResourceRef};
use crate::failure::Failure;
use crate::middleware::Executor;
use crate::pipeline::Collaborators;
use crate::policy::{Policy, PolicyTable};
use crate::validation::{RecordStore, Rule, RuleSet};

/// "Rename note #id to title": owned, validated, returns the new title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rename {
    pub id: Option<RecordId>,
    pub title: Option<String>,
}

impl Rename {
    pub fn new(id: u64, title: &str) -> Self {
        Self {
            id: Some(RecordId::new(id)),
            title: Some(title.to_string()),
        }
    }
}

impl CommandKind for Rename {
    const KIND: &'static str = "notes.rename";
    type Output = String;

    fn rules(&self) -> RuleSet {
        RuleSet::new()
            .field("id", self.id, [Rule::Presence, Rule::exists("notes")])
            .field("title", &self.title, [Rule::Presence, Rule::length(2, 40)])
    }

    fn target(&self) -> Option<ResourceRef> {
        self.id.map(|id| ResourceRef::new("notes", id))
    }
}

pub fn rename_command(credential: Option<Credential>) -> Command<Rename> {
    Command::new(Rename::new(1, "renamed"), credential)
}

pub fn login_session() -> Session {
    Session::new(PrincipalId::new(), vec![Permission::new("notes.login")])
}

/// Records keyed by `(collection, id)` with an owner and a title.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    rows: RwLock<HashMap<(String, RecordId), (PrincipalId, String)>>,
    poisoned: AtomicBool,
}

impl MemoryRecords {
    pub fn put(&self, collection: &str, id: RecordId, owner: PrincipalId, title: &str) {
        self.rows
            .write()
            .unwrap()
            .insert((collection.to_string(), id), (owner, title.to_string()));
    }

    /// Make every lookup fail as if the backing store were down.
    pub fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(DomainError::unavailable("records offline"));
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecords {
    fn exists(&self, collection: &str, id: RecordId) -> Result<bool, DomainError> {
        self.check()?;
        Ok(self.rows.read().unwrap().contains_key(&(collection.to_string(), id)))
    }

    fn is_taken(
        &self,
        collection: &str,
        _field: &str,
        value: &str,
        except: Option<RecordId>,
    ) -> Result<bool, DomainError> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .any(|((c, id), (_, title))| c == collection && title == value && Some(*id) != except))
    }

    fn owner_of(&self, collection: &str, id: RecordId) -> Result<Option<PrincipalId>, DomainError> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .get(&(collection.to_string(), id))
            .map(|(owner, _)| *owner))
    }
}

/// Executor that counts its invocations and echoes the requested title.
#[derive(Clone)]
pub struct CountingExecutor {
    executions: Arc<AtomicUsize>,
}

impl Executor<Rename> for CountingExecutor {
    fn execute(&self, command: &Command<Rename>) -> Result<Option<String>, Failure> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(command.input().title.clone())
    }
}

pub struct Harness {
    pub tokens: Arc<InMemoryTokenRegistry>,
    pub records: Arc<MemoryRecords>,
    pub policies: Arc<PolicyTable>,
    pub executions: Arc<AtomicUsize>,
}

impl Harness {
    /// `notes.rename` requires `notes.login` and ownership.
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(InMemoryTokenRegistry::new()),
            records: Arc::new(MemoryRecords::default()),
            policies: Arc::new(
                PolicyTable::new().with(Rename::KIND, Policy::requires("notes.login").with_ownership()),
            ),
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn issue(&self, session: Session) -> Credential {
        Credential::new(self.tokens.issue(session).unwrap())
    }

    pub fn executor(&self) -> CountingExecutor {
        CountingExecutor {
            executions: self.executions.clone(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(self.tokens.clone(), self.policies.clone(), self.records.clone())
    }
}
