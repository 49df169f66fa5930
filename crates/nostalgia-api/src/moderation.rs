//! Handlers for `/moderation` endpoints. Administrators only.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/moderation` | Every submission, partitioned by status |
//! | `POST` | `/moderation/{id}/review` | Body: `{"decision":"approve"\|"deny","notes":"..."}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use nostalgia_core::submission::{ReviewDecision, UserSubmittedFact};
use nostalgia_engine::{Dashboard, Engine, Stack};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, identity::Authenticated};

/// `GET /moderation`
pub async fn dashboard<X: Stack>(
  State(engine): State<Arc<Engine<X>>>,
  Authenticated(actor): Authenticated,
) -> Result<Json<Dashboard>, ApiError> {
  Ok(Json(engine.dashboard(&actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub decision: ReviewDecision,
  pub notes:    Option<String>,
}

/// `POST /moderation/{id}/review`
pub async fn review<X: Stack>(
  State(engine): State<Arc<Engine<X>>>,
  Authenticated(actor): Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<UserSubmittedFact>, ApiError> {
  Ok(Json(engine.review(&actor, id, body.decision, body.notes).await?))
}
