//! Handler for `GET /categories`.

use std::sync::Arc;

use axum::{Json, extract::State};
use nostalgia_core::category::Category;
use nostalgia_engine::{Engine, Stack};

use crate::error::ApiError;

/// `GET /categories`: every category, ordered by name.
pub async fn list<X: Stack>(
  State(engine): State<Arc<Engine<X>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
  Ok(Json(engine.categories().await?))
}
