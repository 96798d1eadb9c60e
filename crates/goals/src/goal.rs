use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use milestone_core::{Entity, PrincipalId, RecordId};

/// A goal owned by one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: RecordId,
    pub owner: PrincipalId,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub banner_content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Goal {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn collection() -> &'static str {
        "goals"
    }
}

/// Fields of a goal about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalDraft {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub banner_content_type: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub banner_content_type: Option<String>,
}

impl GoalPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.url.is_none()
            && self.banner_content_type.is_none()
    }
}

impl Goal {
    pub(crate) fn apply(&mut self, patch: GoalPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(url) = patch.url {
            self.url = Some(url);
        }
        if let Some(content_type) = patch.banner_content_type {
            self.banner_content_type = Some(content_type);
        }
        self.updated_at = now;
    }
}
