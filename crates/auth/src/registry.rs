//! Credential registries: turn a presented bearer token into a [`Session`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::{validate_claims, JwtClaims, Session, TokenValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The registry has no record of this token (never issued or revoked).
    #[error("unknown token")]
    Unknown,

    #[error(transparent)]
    Invalid(#[from] TokenValidationError),

    /// The token could not be decoded or its signature did not verify.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The registry itself failed (not the caller's fault).
    #[error("token registry unavailable: {0}")]
    Unavailable(String),
}

impl TokenError {
    /// Whether the failure lies with the registry rather than the credential.
    pub fn is_internal(&self) -> bool {
        matches!(self, TokenError::Unavailable(_))
    }
}

/// Resolves bearer tokens into sessions.
///
/// Implementations must be safe to share between concurrent requests; the
/// pipeline only ever reads through this trait.
pub trait TokenRegistry: Send + Sync {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError>;
}

impl<S> TokenRegistry for Arc<S>
where
    S: TokenRegistry + ?Sized,
{
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError> {
        (**self).resolve(token, now)
    }
}

/// In-memory registry of issued tokens for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTokenRegistry {
    inner: RwLock<HashMap<String, Session>>,
}

impl InMemoryTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh opaque token for `session` and return it.
    pub fn issue(&self, session: Session) -> Result<String, TokenError> {
        let token = Uuid::now_v7().simple().to_string();
        self.insert(token.clone(), session)?;
        Ok(token)
    }

    /// Register `token` for `session`, replacing any previous session.
    pub fn insert(&self, token: impl Into<String>, session: Session) -> Result<(), TokenError> {
        let mut map = self
            .inner
            .write()
            .map_err(|e| TokenError::Unavailable(e.to_string()))?;
        map.insert(token.into(), session);
        Ok(())
    }

    /// Revoke `token`. Returns whether it was known.
    pub fn revoke(&self, token: &str) -> Result<bool, TokenError> {
        let mut map = self
            .inner
            .write()
            .map_err(|e| TokenError::Unavailable(e.to_string()))?;
        Ok(map.remove(token).is_some())
    }
}

impl TokenRegistry for InMemoryTokenRegistry {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError> {
        let map = self
            .inner
            .read()
            .map_err(|e| TokenError::Unavailable(e.to_string()))?;
        let session = map.get(token).ok_or(TokenError::Unknown)?;
        if session.is_expired(now) {
            return Err(TokenValidationError::Expired.into());
        }
        Ok(session.clone())
    }
}

/// HS256 JWT registry: any token signed with the shared secret is accepted
/// while its claims are inside their validity window.
pub struct JwtTokenRegistry {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenRegistry {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        // Time checks are done by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims` into a compact JWT.
    pub fn mint(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Unavailable(e.to_string()))
    }
}

impl core::fmt::Debug for JwtTokenRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtTokenRegistry").finish_non_exhaustive()
    }
}

impl TokenRegistry for JwtTokenRegistry {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "jwt rejected");
                TokenError::Malformed(e.to_string())
            })?;
        validate_claims(&data.claims, now).inspect_err(|e| {
            tracing::debug!(principal_id = %data.claims.sub, error = %e, "jwt outside validity window");
        })?;
        Ok(data.claims.into_session())
    }
}
