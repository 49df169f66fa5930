//! Handlers for `/submissions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/submissions` | Body: a submission form; returns 201 + stored submission |
//! | `GET`  | `/submissions/{id}` | Visible to the author and administrators |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use nostalgia_core::submission::{SubmissionForm, UserSubmittedFact};
use nostalgia_engine::{Engine, Stack};
use uuid::Uuid;

use crate::{error::ApiError, identity::Authenticated};

/// `POST /submissions`
pub async fn create<X: Stack>(
  State(engine): State<Arc<Engine<X>>>,
  Authenticated(actor): Authenticated,
  Json(form): Json<SubmissionForm>,
) -> Result<impl IntoResponse, ApiError> {
  let stored = engine.submit(&actor, form).await?;
  Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /submissions/{id}`
pub async fn get_one<X: Stack>(
  State(engine): State<Arc<Engine<X>>>,
  Authenticated(actor): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<UserSubmittedFact>, ApiError> {
  Ok(Json(engine.submission_for(&actor, id).await?))
}
