//! Caller identity supplied by the upstream authentication layer.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use whiteroom_narrative::domain::aggregates::Session;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// What a caller is allowed to act as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A participant.
    Player,
    /// A session owner.
    Architect,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// User id.
    pub user_id: String,
    /// Role claimed by the authentication layer.
    pub role: Role,
}

impl Actor {
    /// Reads identity headers. Returns `None` without a non-empty user id;
    /// any role other than `architect` is treated as a player.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers
            .get(USER_ID_HEADER)?
            .to_str()
            .ok()?
            .trim()
            .to_owned();
        if user_id.is_empty() {
            return None;
        }
        let role = match headers.get(USER_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
            Some(role) if role.trim().eq_ignore_ascii_case("architect") => Role::Architect,
            _ => Role::Player,
        };
        Some(Self { user_id, role })
    }

    /// Whether the caller holds the architect role and owns `session`.
    #[must_use]
    pub fn is_architect_of(&self, session: &Session) -> bool {
        self.role == Role::Architect && session.is_architect(&self.user_id)
    }

    /// Checks a user id taken from a request body against the caller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` when `claimed` names someone else.
    pub fn vouch_for(&self, field: &str, claimed: &str) -> Result<(), ApiError> {
        if self.user_id == claimed.trim() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "{field} does not match {USER_ID_HEADER}"
            )))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))
    }
}

/// Identity is optional on routes that also accept a body-supplied user id.
impl<S: Send + Sync> OptionalFromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
