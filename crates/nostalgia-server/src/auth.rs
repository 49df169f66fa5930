//! HTTP Basic-auth layer.
//!
//! Requests with valid credentials gain a [`CurrentUser`] extension. Requests
//! without an `Authorization` header pass through anonymously; the API decides
//! which routes need a user. Bad credentials are rejected outright.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use nostalgia_api::{ApiError, CurrentUser};
use rand_core::OsRng;
use tracing::debug;

use crate::settings::Account;

/// The configured logins.
#[derive(Debug, Clone, Default)]
pub struct Accounts(Vec<Account>);

impl Accounts {
  pub fn new(accounts: Vec<Account>) -> Self { Self(accounts) }

  fn find(&self, username: &str) -> Option<&Account> {
    self.0.iter().find(|a| a.username == username)
  }
}

/// Resolve the caller from request headers.
///
/// `Ok(None)` means no credentials were offered at all.
pub fn identify(headers: &HeaderMap, accounts: &Accounts) -> Result<Option<CurrentUser>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let value = value.to_str().map_err(|_| ApiError::Unauthenticated)?;

  let encoded = value.strip_prefix("Basic ").ok_or(ApiError::Unauthenticated)?;
  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthenticated)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthenticated)?;
  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthenticated)?;

  let account = accounts.find(username).ok_or(ApiError::Unauthenticated)?;
  let parsed_hash =
    PasswordHash::new(&account.password_hash).map_err(|_| ApiError::Unauthenticated)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthenticated)?;

  Ok(Some(CurrentUser {
    user_id:  account.user_id,
    username: account.username.clone(),
    role:     account.role,
  }))
}

/// Middleware for [`axum::middleware::from_fn_with_state`].
pub async fn authenticate(
  State(accounts): State<Arc<Accounts>>,
  mut req: Request,
  next: Next,
) -> Response {
  match identify(req.headers(), &accounts) {
    Ok(Some(user)) => {
      debug!(username = %user.username, "authenticated request");
      req.extensions_mut().insert(user);
      next.run(req).await
    }
    Ok(None) => next.run(req).await,
    Err(e) => e.into_response(),
  }
}

/// Produce the argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}
