//! Handlers for the read side: `/results/{grad_year}` and `/changes`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/results/{grad_year}` | Optional `?category=<slug>&page=<n>`; ETag-aware |
//! | `GET`  | `/changes` | `?grad_year=<y>&category=<slug>`, both required |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use nostalgia_core::fact::CategoryChanges;
use nostalgia_engine::{Engine, ResultsQuery, Stack};
use serde::Deserialize;

use crate::{error::ApiError, etag};

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResultsParams {
  pub category: Option<String>,
  pub page:     Option<usize>,
}

/// `GET /results/{grad_year}[?category=<slug>][&page=<n>]`
///
/// Answers 304 when `If-None-Match` names the current ETag.
pub async fn results<X: Stack>(
  State(engine): State<Arc<Engine<X>>>,
  Path(grad_year): Path<i32>,
  Query(params): Query<ResultsParams>,
  headers: HeaderMap,
) -> Result<Response, ApiError> {
  let page = engine
    .results(ResultsQuery { grad_year, category: params.category, page: params.page })
    .await?;

  let tag = etag::compute_etag(&page);
  let tag_value = HeaderValue::from_str(&tag).map_err(|e| ApiError::Internal(Box::new(e)))?;

  let fresh = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| etag::matches(v, &tag));
  if fresh {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, tag_value)]).into_response());
  }
  Ok(([(header::ETAG, tag_value)], Json(page)).into_response())
}

// ─── Changes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChangesParams {
  pub grad_year: i32,
  pub category:  String,
}

/// `GET /changes?grad_year=<y>&category=<slug>`
pub async fn changes<X: Stack>(
  State(engine): State<Arc<Engine<X>>>,
  Query(params): Query<ChangesParams>,
) -> Result<Json<CategoryChanges>, ApiError> {
  Ok(Json(engine.changes(params.grad_year, &params.category).await?))
}
