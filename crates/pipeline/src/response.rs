use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::failure::Failure;

/// Boundary status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    NoContent,
    Unauthorized,
    Forbidden,
    UnprocessableEntity,
    InternalServerError,
}

impl Status {
    /// HTTP-compatible numeric code.
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NoContent => 204,
            Status::Unauthorized => 401,
            Status::Forbidden => 403,
            Status::UnprocessableEntity => 422,
            Status::InternalServerError => 500,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::NoContent)
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Transport-level response produced by the rendering or error-translation stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub body: Option<JsonValue>,
}

impl Response {
    pub fn new(status: Status, body: Option<JsonValue>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: JsonValue) -> Self {
        Self::new(Status::Ok, Some(body))
    }

    pub fn no_content() -> Self {
        Self::new(Status::NoContent, None)
    }
}

/// What a stage hands back up the chain when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The executor ran; its payload (if any) sits on the command.
    Pending,
    /// A response has been produced and should travel up unchanged.
    Rendered(Response),
}

impl Reply {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Reply::Pending => None,
            Reply::Rendered(r) => Some(r),
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Reply::Pending => None,
            Reply::Rendered(r) => Some(r),
        }
    }
}

/// Return type of every stage.
pub type Flow = Result<Reply, Failure>;
