//! Goal endpoints.
//!
//! Each handler builds the raw field map (JSON body merged with path
//! parameters, path wins) and hands it to the goal service together with the
//! request credential. Authorization, validation and ownership all happen in
//! the service's pipeline.

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    routing::get,
    Router,
};
use serde_json::json;

use milestone_core::RecordId;
use milestone_pipeline::{RawFields, Submission, ValidationErrors};

use crate::app::errors::{body_fields, to_http};
use crate::app::services::AppServices;
use crate::context::RequestCredential;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/:id", get(get_goal).patch(update_goal).delete(delete_goal))
}

/// Merge the path id into the submission. A malformed id is reported on `id`
/// next to any earlier rejection.
fn with_id(submission: Submission, raw: &str) -> Submission {
    match (submission, raw.parse::<RecordId>()) {
        (Submission::Fields(mut fields), Ok(id)) => {
            fields.insert("id".to_string(), json!(id.get()));
            Submission::Fields(fields)
        }
        (Submission::Rejected(errors), Ok(_)) => Submission::Rejected(errors),
        (submission, Err(_)) => {
            let mut errors = match submission {
                Submission::Rejected(errors) => errors,
                Submission::Fields(_) => ValidationErrors::new(),
            };
            errors.add("id", "format", "is not a valid id");
            Submission::Rejected(errors)
        }
    }
}

pub async fn list_goals(
    Extension(services): Extension<AppServices>,
    Extension(credential): Extension<RequestCredential>,
) -> axum::response::Response {
    to_http(services.goals.list(RawFields::new(), credential.into_inner()))
}

pub async fn create_goal(
    Extension(services): Extension<AppServices>,
    Extension(credential): Extension<RequestCredential>,
    body: Bytes,
) -> axum::response::Response {
    to_http(services.goals.create(body_fields(&body), credential.into_inner()))
}

pub async fn get_goal(
    Extension(services): Extension<AppServices>,
    Extension(credential): Extension<RequestCredential>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let submission = with_id(RawFields::new().into(), &id);
    to_http(services.goals.view(submission, credential.into_inner()))
}

pub async fn update_goal(
    Extension(services): Extension<AppServices>,
    Extension(credential): Extension<RequestCredential>,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    let submission = with_id(body_fields(&body), &id);
    to_http(services.goals.update(submission, credential.into_inner()))
}

pub async fn delete_goal(
    Extension(services): Extension<AppServices>,
    Extension(credential): Extension<RequestCredential>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let submission = with_id(RawFields::new().into(), &id);
    to_http(services.goals.delete(submission, credential.into_inner()))
}
