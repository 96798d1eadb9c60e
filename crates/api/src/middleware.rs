use axum::{
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use milestone_pipeline::Credential;

use crate::context::RequestCredential;

/// Attach the bearer credential (possibly none) to the request.
///
/// Never rejects: an absent or malformed header simply yields no credential,
/// and the command's policy decides whether that is acceptable.
pub async fn credential_middleware(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let credential = extract_bearer(req.headers()).map(Credential::new);
    req.extensions_mut().insert(RequestCredential::new(credential));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
