//! In-memory goal storage.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use milestone_core::{DomainError, DomainResult, Entity, PrincipalId, RecordId};
use milestone_pipeline::RecordStore;

use crate::goal::{Goal, GoalDraft, GoalPatch};

#[derive(Debug)]
struct State {
    next_id: RecordId,
    goals: BTreeMap<RecordId, Goal>,
}

/// Goal records behind a lock; ids are sequential starting at 1.
///
/// Also serves as the pipeline's [`RecordStore`] for the `goals` collection.
#[derive(Debug)]
pub struct GoalStore {
    inner: RwLock<State>,
}

impl Default for GoalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(State {
                next_id: RecordId::new(1),
                goals: BTreeMap::new(),
            }),
        }
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, State>> {
        self.inner.read().map_err(|e| DomainError::unavailable(e.to_string()))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, State>> {
        self.inner.write().map_err(|e| DomainError::unavailable(e.to_string()))
    }

    pub fn insert(&self, owner: PrincipalId, draft: GoalDraft) -> DomainResult<Goal> {
        let mut state = self.write()?;
        if state.goals.values().any(|g| g.title == draft.title) {
            return Err(DomainError::conflict(format!("title '{}' is taken", draft.title)));
        }

        let id = state.next_id;
        let following = id.next()?;
        let now = Utc::now();
        let goal = Goal {
            id,
            owner,
            title: draft.title,
            description: draft.description,
            url: draft.url,
            banner_content_type: draft.banner_content_type,
            created_at: now,
            updated_at: now,
        };
        state.next_id = following;
        state.goals.insert(id, goal.clone());
        Ok(goal)
    }

    /// Store `goal` under its own id (imports and fixtures).
    pub fn restore(&self, goal: Goal) -> DomainResult<()> {
        let mut state = self.write()?;
        if goal.id >= state.next_id {
            state.next_id = goal.id.next()?;
        }
        state.goals.insert(goal.id, goal);
        Ok(())
    }

    pub fn get(&self, id: RecordId) -> DomainResult<Goal> {
        self.read()?.goals.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    /// Goals owned by `owner`, by id.
    pub fn list_by_owner(&self, owner: PrincipalId) -> DomainResult<Vec<Goal>> {
        Ok(self
            .read()?
            .goals
            .values()
            .filter(|g| g.owner == owner)
            .cloned()
            .collect())
    }

    pub fn update(&self, id: RecordId, patch: GoalPatch) -> DomainResult<Goal> {
        let mut state = self.write()?;
        if let Some(title) = &patch.title {
            if state.goals.values().any(|g| g.id != id && &g.title == title) {
                return Err(DomainError::conflict(format!("title '{title}' is taken")));
            }
        }

        let goal = state.goals.get_mut(&id).ok_or(DomainError::NotFound)?;
        goal.apply(patch, Utc::now());
        Ok(goal.clone())
    }

    pub fn delete(&self, id: RecordId) -> DomainResult<Goal> {
        self.write()?.goals.remove(&id).ok_or(DomainError::NotFound)
    }

    pub fn len(&self) -> DomainResult<usize> {
        Ok(self.read()?.goals.len())
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl RecordStore for GoalStore {
    fn exists(&self, collection: &str, id: RecordId) -> Result<bool, DomainError> {
        if collection != Goal::collection() {
            return Ok(false);
        }
        Ok(self.read()?.goals.contains_key(&id))
    }

    fn is_taken(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        except: Option<RecordId>,
    ) -> Result<bool, DomainError> {
        if collection != Goal::collection() {
            return Ok(false);
        }
        if field != "title" {
            return Err(DomainError::validation(format!("goals.{field} has no uniqueness index")));
        }
        Ok(self
            .read()?
            .goals
            .values()
            .any(|g| g.title == value && Some(g.id) != except))
    }

    fn owner_of(&self, collection: &str, id: RecordId) -> Result<Option<PrincipalId>, DomainError> {
        if collection != Goal::collection() {
            return Ok(None);
        }
        Ok(self.read()?.goals.get(&id).map(|g| g.owner))
    }
}
