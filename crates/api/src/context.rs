use milestone_pipeline::Credential;

/// Credential presented with a request, if any.
///
/// Inserted by [`crate::middleware::credential_middleware`] for every request;
/// whether it is required is decided per command by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredential {
    credential: Option<Credential>,
}

impl RequestCredential {
    pub fn new(credential: Option<Credential>) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn into_inner(self) -> Option<Credential> {
        self.credential
    }
}
