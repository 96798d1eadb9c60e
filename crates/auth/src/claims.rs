use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use milestone_core::PrincipalId;

use crate::{Permission, Session};

/// JWT claims model (transport-agnostic).
///
/// This is the minimal set of claims expected once a token has been decoded
/// and its signature verified. Timestamps travel as Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Permissions granted to the bearer.
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Issued-at timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn into_session(self) -> Session {
        Session::new(self.sub, self.permissions).expiring_at(self.expires_at)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// [`crate::JwtTokenRegistry`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn claims_at(issued_at: DateTime<Utc>, ttl: Duration) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            permissions: vec![Permission::new("goals.login")],
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    #[test]
    fn claims_inside_window_are_valid() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::minutes(10));
        assert_eq!(validate_claims(&claims, t0 + Duration::minutes(5)), Ok(()));
    }

    #[test]
    fn expiry_is_exclusive() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::minutes(10));
        assert_eq!(
            validate_claims(&claims, t0 + Duration::minutes(10)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn future_tokens_are_rejected() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::minutes(10));
        assert_eq!(
            validate_claims(&claims, t0 - Duration::seconds(1)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::minutes(-1));
        assert_eq!(validate_claims(&claims, t0), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn timestamps_serialize_as_unix_seconds() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::seconds(60));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["issued_at"], serde_json::json!(t0.timestamp()));
        assert_eq!(json["expires_at"], serde_json::json!(t0.timestamp() + 60));
    }
}
