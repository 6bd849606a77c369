// ABOUTME: Bearer-token verification for platform-issued JWTs
// ABOUTME: Yields the authenticated user id or a 401, nothing else
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Authentication
//!
//! Verifies the HS256 bearer tokens the platform issues its mobile clients.
//! This service never mints user-facing tokens itself; the helper below
//! exists for the test suite and local tooling.

use crate::errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims carried by platform tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier
    pub sub: String,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

/// The verified caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Verifies bearer tokens against the shared platform secret
pub struct AuthManager {
    secret: Option<String>,
}

impl AuthManager {
    /// Create a manager; with no secret configured every request is rejected
    #[must_use]
    pub const fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Verify an `Authorization` header value and extract the caller
    ///
    /// # Errors
    ///
    /// Returns an unauthenticated error for a missing header, a malformed
    /// scheme, an invalid or expired token, or a missing server secret.
    pub fn authenticate(&self, authorization: Option<&str>) -> AppResult<AuthenticatedUser> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| AppError::unauthenticated("authentication is not configured"))?;

        let header =
            authorization.ok_or_else(|| AppError::unauthenticated("missing bearer token"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthenticated("expected Bearer scheme"))?;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::unauthenticated("invalid or expired token"))?;

        Ok(AuthenticatedUser {
            user_id: data.claims.sub,
        })
    }

    /// Mint a token for tests and local tooling
    ///
    /// # Errors
    ///
    /// Returns an internal error if no secret is configured or encoding fails.
    pub fn generate_token(&self, user_id: &str, valid_for_hours: i64) -> AppResult<String> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| AppError::internal("no signing secret configured"))?;
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(valid_for_hours)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("token encoding failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn manager() -> AuthManager {
        AuthManager::new(Some("test-secret".to_owned()))
    }

    #[test]
    fn test_roundtrip() {
        let manager = manager();
        let token = manager.generate_token("u1", 1).unwrap();
        let user = manager
            .authenticate(Some(&format!("Bearer {token}")))
            .unwrap();
        assert_eq!(user.user_id, "u1");
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = manager().authenticate(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let err = manager().authenticate(Some("Basic abc")).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = manager();
        let token = manager.generate_token("u1", 1).unwrap();
        let other = AuthManager::new(Some("other-secret".to_owned()));
        let err = other
            .authenticate(Some(&format!("Bearer {token}")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = manager();
        let token = manager.generate_token("u1", -2).unwrap();
        let err = manager
            .authenticate(Some(&format!("Bearer {token}")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);
    }
}
