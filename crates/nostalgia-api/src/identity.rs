//! Caller identity, as handed over by whatever authentication layer sits in
//! front of the router.

use axum::{extract::FromRequestParts, http::request::Parts};
use nostalgia_core::user::{Actor, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Request extension inserted by the auth layer for authenticated requests.
/// Requests without it are anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
  pub user_id:  Uuid,
  pub username: String,
  pub role:     Role,
}

impl From<CurrentUser> for Actor {
  fn from(u: CurrentUser) -> Self {
    Actor { user_id: u.user_id, username: u.username, role: u.role }
  }
}

/// Extractor for routes that need a signed-in user. Rejects with 401.
pub struct Authenticated(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<CurrentUser>()
      .cloned()
      .map(|u| Authenticated(u.into()))
      .ok_or(ApiError::Unauthenticated)
  }
}
