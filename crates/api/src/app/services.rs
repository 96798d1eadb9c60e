use std::sync::Arc;

use milestone_auth::JwtTokenRegistry;
use milestone_goals::GoalService;

/// Shared application services handed to every handler.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub goals: Arc<GoalService>,
}

/// Goal service backed by an in-memory store, accepting HS256 tokens signed
/// with `jwt_secret`.
pub fn build_services(jwt_secret: String) -> AppServices {
    let tokens = Arc::new(JwtTokenRegistry::new(jwt_secret.into_bytes()));
    AppServices {
        goals: Arc::new(GoalService::new(tokens)),
    }
}
