//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: token registry and goal service construction
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: mapping pipeline responses and transport errors to HTTP

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: String) -> Router {
    let services = services::build_services(jwt_secret);

    let goals = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::credential_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(goals)
        .layer(ServiceBuilder::new())
}
