use axum::Router;

pub mod goals;
pub mod system;

/// Router for all goal endpoints (credential optional at this layer).
pub fn router() -> Router {
    Router::new().nest("/goals", goals::router())
}
