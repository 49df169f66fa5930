//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use nostalgia_core::ValidationErrors;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Body sent for every 500. Internal detail stays in the logs.
pub const GENERIC_FAILURE: &str = "an unexpected error occurred";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid input: {0}")]
  Validation(ValidationErrors),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{0}")]
  RateLimited(String),

  #[error("authentication required")]
  Unauthenticated,

  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<nostalgia_engine::Error> for ApiError {
  fn from(e: nostalgia_engine::Error) -> Self {
    use nostalgia_core::Error as Core;
    use nostalgia_engine::Error as Engine;

    match e {
      Engine::Core(Core::Validation(errors)) => Self::Validation(errors),
      Engine::Core(e @ Core::YearOutOfRange { .. }) => Self::BadRequest(e.to_string()),
      Engine::Core(Core::RateLimited { limit }) => Self::RateLimited(format!(
        "You can submit at most {limit} facts per hour. Please try again later."
      )),
      Engine::Core(e @ (Core::AlreadyReviewed(_) | Core::NotReviewable(_))) => {
        Self::Conflict(e.to_string())
      }
      Engine::NoCategories => Self::BadRequest(Engine::NoCategories.to_string()),
      Engine::NotFound(what) => Self::NotFound(what),
      Engine::Forbidden => Self::Forbidden,
      other => Self::Internal(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Validation(fields) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": "validation failed", "fields": fields }),
      ),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::RateLimited(m) => (StatusCode::TOO_MANY_REQUESTS, json!({ "error": m })),
      ApiError::Unauthenticated => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": self.to_string() }))).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"nostalgia\""),
        );
        return res;
      }
      ApiError::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": "administrator role required" })),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": format!("{m} not found") })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Internal(e) => {
        error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": GENERIC_FAILURE }))
      }
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use nostalgia_core::Error as Core;
  use uuid::Uuid;

  use super::*;

  fn status(e: impl Into<ApiError>) -> StatusCode { e.into().into_response().status() }

  #[test]
  fn engine_errors_map_to_statuses() {
    use nostalgia_engine::Error as Engine;

    let mut fields = ValidationErrors::new();
    fields.add("title", "a title is required");
    assert_eq!(status(Engine::Core(Core::Validation(fields))), StatusCode::BAD_REQUEST);
    assert_eq!(
      status(Engine::Core(Core::YearOutOfRange { year: 1, min: 1900, max: 2026 })),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(status(Engine::Core(Core::RateLimited { limit: 5 })), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(status(Engine::Core(Core::AlreadyReviewed(Uuid::nil()))), StatusCode::CONFLICT);
    assert_eq!(status(Engine::NotFound("category".into())), StatusCode::NOT_FOUND);
    assert_eq!(status(Engine::Forbidden), StatusCode::FORBIDDEN);
    assert_eq!(status(Engine::store(std::fmt::Error)), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn internal_errors_hide_detail() {
    let resp = ApiError::from(nostalgia_engine::Error::store(std::io::Error::other(
      "disk on fire at /var/db",
    )))
    .into_response();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": GENERIC_FAILURE }));
  }

  #[test]
  fn unauthenticated_asks_for_basic_auth() {
    let resp = ApiError::Unauthenticated.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
