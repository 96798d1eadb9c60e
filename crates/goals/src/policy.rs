use milestone_auth::Permission;
use milestone_pipeline::{CommandKind, Policy, PolicyTable};

use crate::commands::{CreateGoal, DeleteGoal, ListGoals, UpdateGoal, ViewGoal};

/// Permission every signed-in user holds.
pub const LOGIN: Permission = Permission::from_static("goals.login");

/// Every goal kind needs a signed-in caller; reading, changing or deleting one
/// goal also needs the caller to own it.
pub fn default_policies() -> PolicyTable {
    PolicyTable::new()
        .with(CreateGoal::KIND, Policy::requires(LOGIN))
        .with(ListGoals::KIND, Policy::requires(LOGIN))
        .with(ViewGoal::KIND, Policy::requires(LOGIN).with_ownership())
        .with(UpdateGoal::KIND, Policy::requires(LOGIN).with_ownership())
        .with(DeleteGoal::KIND, Policy::requires(LOGIN).with_ownership())
}
