use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;

use milestone_pipeline::{RawFields, Response, Status, Submission, ValidationErrors};

/// Render a pipeline response as HTTP. A 204 carries no body.
pub fn to_http(response: Response) -> axum::response::Response {
    let status = http_status(response.status);
    match response.body {
        Some(body) if status != StatusCode::NO_CONTENT => (status, axum::Json(body)).into_response(),
        _ => status.into_response(),
    }
}

pub fn http_status(status: Status) -> StatusCode {
    StatusCode::from_u16(status.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Request body as a submission. An empty body is an empty field set;
/// anything but a JSON object becomes a `schema` violation on `base`, reported
/// by the pipeline like any other.
pub fn body_fields(body: &Bytes) -> Submission {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Submission::Fields(RawFields::new());
    }
    let reason = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => return Submission::Fields(fields),
        Ok(_) => "request body must be a JSON object".to_string(),
        Err(e) => e.to_string(),
    };
    let mut errors = ValidationErrors::new();
    errors.add("base", "schema", reason);
    Submission::Rejected(errors)
}
