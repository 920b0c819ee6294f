//! Request extractors: the authenticated caller and JSON bodies.

use super::{ApiError, AppState};
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use schoolhub_core::users::User;
use schoolhub_core::{Reader, Role};
use serde::de::DeserializeOwned;
use tracing::debug;

// =============================================================================
// AUTHENTICATED CALLER
// =============================================================================

/// The caller behind a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: u64,
    pub username: String,
    pub role: Role,
    /// Teacher id for TEACHER accounts, parent id for PARENT accounts.
    pub entity_id: Option<u64>,
}

impl AuthUser {
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Access denied".into()))
        }
    }

    pub fn admin(&self) -> Result<(), ApiError> {
        self.require(&[Role::Admin])
    }

    pub fn staff(&self) -> Result<(), ApiError> {
        self.require(&[Role::Admin, Role::Teacher])
    }

    /// The caller's teacher id, for TEACHER accounts.
    pub fn teacher_id(&self) -> Option<u64> {
        (self.role == Role::Teacher).then_some(self.entity_id).flatten()
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let unauthorized = || ApiError::Unauthorized("Unauthorized".into());
        let token = bearer(parts).ok_or_else(unauthorized)?;
        let claims = state
            .keys()
            .verify(token, Utc::now().timestamp())
            .map_err(|e| {
                debug!(error = %e, "bearer token rejected");
                unauthorized()
            })?;

        let uid = claims.uid;
        let user = state.read(move |r| r.get::<User>(uid)).await?;
        match user {
            Some(u) if u.active && u.username == claims.sub => Ok(Self {
                id: u.id,
                username: u.username,
                role: u.role,
                entity_id: u.entity_id,
            }),
            _ => Err(unauthorized()),
        }
    }
}

// =============================================================================
// JSON BODY
// =============================================================================

/// `Json<T>` whose rejections render as a 400 in the API's error shape.
#[derive(Debug, Clone)]
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}
