//! Goal command kinds.
//!
//! Each kind is a plain input struct deserialized from request fields. Fields
//! are optional at the type level so that a missing value is reported by the
//! `presence` rule (422 with a per-field message) rather than as a schema error.
//! Titles are trimmed while they are read, so the rules see the stored value.

use serde::{Deserialize, Deserializer};

use milestone_core::{Entity, RecordId};
use milestone_pipeline::{CommandKind, ResourceRef, Rule, RuleSet};

use crate::goal::{Goal, GoalDraft, GoalPatch};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 80;
pub const DESCRIPTION_MAX: usize = 2000;

/// Banner media types a goal may reference.
pub const BANNER_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif"];

fn target(id: Option<RecordId>) -> Option<ResourceRef> {
    id.map(|id| ResourceRef::new(Goal::collection(), id))
}

fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|s| s.trim().to_string()))
}

fn id_rules(rules: RuleSet, id: Option<RecordId>) -> RuleSet {
    rules.field("id", id, [Rule::Presence, Rule::exists(Goal::collection())])
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGoal {
    #[serde(default, deserialize_with = "trimmed")]
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub banner_content_type: Option<String>,
}

impl CreateGoal {
    /// Draft for the store. Call only after validation passed.
    pub fn draft(&self) -> GoalDraft {
        GoalDraft {
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone(),
            url: self.url.clone(),
            banner_content_type: self.banner_content_type.clone(),
        }
    }
}

impl CommandKind for CreateGoal {
    const KIND: &'static str = "goals.create";
    type Output = Goal;

    fn rules(&self) -> RuleSet {
        RuleSet::new()
            .field(
                "title",
                &self.title,
                [
                    Rule::Presence,
                    Rule::length(TITLE_MIN, TITLE_MAX),
                    Rule::unique(Goal::collection()),
                ],
            )
            .check("description", &self.description, Rule::max_length(DESCRIPTION_MAX))
            .check("url", &self.url, Rule::Uri)
            .check(
                "banner_content_type",
                &self.banner_content_type,
                Rule::content_type(BANNER_TYPES),
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewGoal {
    pub id: Option<RecordId>,
}

impl CommandKind for ViewGoal {
    const KIND: &'static str = "goals.view";
    type Output = Goal;

    fn rules(&self) -> RuleSet {
        id_rules(RuleSet::new(), self.id)
    }

    fn target(&self) -> Option<ResourceRef> {
        target(self.id)
    }
}

/// Goals owned by the caller. Takes no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListGoals {}

impl CommandKind for ListGoals {
    const KIND: &'static str = "goals.list";
    type Output = Vec<Goal>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGoal {
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "trimmed")]
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub banner_content_type: Option<String>,
}

impl UpdateGoal {
    pub fn patch(&self) -> GoalPatch {
        GoalPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            banner_content_type: self.banner_content_type.clone(),
        }
    }
}

impl CommandKind for UpdateGoal {
    const KIND: &'static str = "goals.update";
    type Output = Goal;

    fn rules(&self) -> RuleSet {
        let mut title = vec![
            Rule::length(TITLE_MIN, TITLE_MAX),
            Rule::unique_except(Goal::collection(), self.id),
        ];
        // Optional on update, but never blank once given.
        if self.title.is_some() {
            title.insert(0, Rule::Presence);
        }

        id_rules(RuleSet::new(), self.id)
            .field("title", &self.title, title)
            .check("description", &self.description, Rule::max_length(DESCRIPTION_MAX))
            .check("url", &self.url, Rule::Uri)
            .check(
                "banner_content_type",
                &self.banner_content_type,
                Rule::content_type(BANNER_TYPES),
            )
    }

    fn target(&self) -> Option<ResourceRef> {
        target(self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteGoal {
    pub id: Option<RecordId>,
}

impl CommandKind for DeleteGoal {
    const KIND: &'static str = "goals.delete";
    /// Deletion produces no result (rendered as 204).
    type Output = ();

    fn rules(&self) -> RuleSet {
        id_rules(RuleSet::new(), self.id)
    }

    fn target(&self) -> Option<ResourceRef> {
        target(self.id)
    }
}
