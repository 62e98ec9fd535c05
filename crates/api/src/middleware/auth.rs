//! # Actor Identity Extraction
//!
//! Authentication lives outside this service: an upstream identity gateway
//! verifies credentials and forwards an already-authenticated, opaque subject
//! id as the bearer token, together with the subject's role set in the
//! `X-Actor-Roles` header. This module only decodes that identity into an
//! [`Actor`] — it never sees or parses credentials.
//!
//! Requests without a usable identity are rejected with 401 before any
//! handler logic runs.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use tutorlink_core::errors::TutorError;
use tutorlink_core::models::actor::{Actor, Role};
use uuid::Uuid;

use crate::middleware::error_handling::AppError;

/// Header carrying the authenticated subject's roles, comma-separated.
pub const ROLES_HEADER: &str = "x-actor-roles";

/// Extractor wrapping the [`Actor`] decoded from the request headers.
#[derive(Debug, Clone)]
pub struct AuthenticatedActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| unauthenticated("Missing authorization header"))?
            .to_str()
            .map_err(|_| unauthenticated("Malformed authorization header"))?;

        let subject = authorization
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthenticated("Expected a bearer token"))?
            .trim();

        if subject.is_empty() {
            return Err(unauthenticated("Empty subject id"));
        }

        let id = Uuid::parse_str(subject)
            .map_err(|_| unauthenticated("Subject id is not a valid UUID"))?;

        let roles = match parts.headers.get(ROLES_HEADER) {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| unauthenticated("Malformed roles header"))?;
                parse_roles(value).map_err(unauthenticated)?
            }
            None => Vec::new(),
        };

        Ok(AuthenticatedActor(Actor::new(id, roles)))
    }
}

fn parse_roles(value: &str) -> Result<Vec<Role>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

fn unauthenticated(reason: impl Into<String>) -> AppError {
    AppError(TutorError::Authentication(reason.into()))
}
