//! JSON REST API for Nostalgia.
//!
//! Exposes an axum [`Router`] backed by any [`Engine`]. Authentication, TLS
//! and transport concerns are the caller's responsibility: an auth layer in
//! front of the router inserts a [`CurrentUser`] extension for signed-in
//! requests, and everything else is treated as anonymous.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", nostalgia_api::api_router(engine.clone()))
//! ```

pub mod categories;
pub mod error;
pub mod etag;
pub mod identity;
pub mod moderation;
pub mod results;
pub mod submissions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use nostalgia_engine::{Engine, Stack};

pub use error::ApiError;
pub use identity::{Authenticated, CurrentUser};

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<X: Stack>(engine: Arc<Engine<X>>) -> Router<()> {
  Router::new()
    // Read side
    .route("/categories", get(categories::list::<X>))
    .route("/results/{grad_year}", get(results::results::<X>))
    .route("/changes", get(results::changes::<X>))
    // Submissions
    .route("/submissions", post(submissions::create::<X>))
    .route("/submissions/{id}", get(submissions::get_one::<X>))
    // Moderation
    .route("/moderation", get(moderation::dashboard::<X>))
    .route("/moderation/{id}/review", post(moderation::review::<X>))
    .with_state(engine)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use nostalgia_core::{category::NewCategory, kv::MemoryKv, store::FactStore, user::Role};
  use nostalgia_engine::EngineSettings;
  use nostalgia_sources::{
    BannedAuthors, CatalogWork, Encyclopedia, EncyclopediaPage, LibraryCatalog, SourceError,
    Sources,
  };
  use nostalgia_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt;
  use uuid::Uuid;

  use super::*;

  /// Sources that never find anything.
  struct Silent;

  impl Encyclopedia for Silent {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, SourceError> {
      Ok(Vec::new())
    }

    async fn page(&self, title: &str) -> Result<EncyclopediaPage, SourceError> {
      Err(SourceError::NotFound(title.to_owned()))
    }
  }

  impl LibraryCatalog for Silent {
    async fn works(
      &self,
      _year: i32,
      _subject: &str,
      _limit: usize,
    ) -> Result<Vec<CatalogWork>, SourceError> {
      Ok(Vec::new())
    }
  }

  struct TestStack;

  impl Stack for TestStack {
    type Store = SqliteStore;
    type Kv = MemoryKv;
    type Encyclopedia = Silent;
    type Catalog = Silent;
  }

  async fn engine() -> Arc<Engine<TestStack>> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.add_category(NewCategory::named("Technology")).await.unwrap();
    let sources = Sources::new(Silent, Silent, BannedAuthors::default());
    Arc::new(Engine::new(store, MemoryKv::new(), sources, EngineSettings::default()))
  }

  fn user(role: Role) -> CurrentUser {
    CurrentUser { user_id: Uuid::new_v4(), username: "someone".into(), role }
  }

  async fn call(
    engine: &Arc<Engine<TestStack>>,
    method: &str,
    uri: &str,
    who: Option<&CurrentUser>,
    headers: Vec<(header::HeaderName, &str)>,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let mut req = builder.body(body).unwrap();
    if let Some(who) = who {
      req.extensions_mut().insert(who.clone());
    }
    api_router(engine.clone()).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn y2k() -> Value {
    json!({
      "year": 1999,
      "title": "Y2K fears",
      "description": "Everyone expected the clocks to break.",
      "categories": ["technology"],
      "source_url": "https://en.wikipedia.org/wiki/Year_2000_problem",
      "want_notification": true,
      "preference": "email",
      "email": "grad@example.com"
    })
  }

  // ── Read side ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn categories_are_public() {
    let engine = engine().await;
    let resp = call(&engine, "GET", "/categories", None, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await[0]["slug"], "technology");
  }

  #[tokio::test]
  async fn results_reject_out_of_range_years() {
    let engine = engine().await;
    let resp = call(&engine, "GET", "/results/1899", None, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = call(&engine, "GET", "/results/1999?category=astrology", None, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn results_honour_if_none_match() {
    let engine = engine().await;
    let uri = "/results/1999?category=technology";
    let resp = call(&engine, "GET", uri, None, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let tag = resp.headers().get(header::ETAG).unwrap().to_str().unwrap().to_owned();
    let body = json_body(resp).await;
    assert_eq!(body["facts"]["total_pages"], 1);
    assert_eq!(body["facts"]["has_next"], false);
    assert_eq!(body["selected_category"]["slug"], "technology");

    let resp =
      call(&engine, "GET", uri, None, vec![(header::IF_NONE_MATCH, tag.as_str())], None).await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
  }

  #[tokio::test]
  async fn changes_need_both_parameters() {
    let engine = engine().await;
    let resp = call(&engine, "GET", "/changes?grad_year=1999", None, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp =
      call(&engine, "GET", "/changes?grad_year=1999&category=technology", None, vec![], None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["category"]["name"], "Technology");
  }

  // ── Submissions and moderation ────────────────────────────────────────────

  #[tokio::test]
  async fn submitting_requires_sign_in() {
    let engine = engine().await;
    let resp = call(&engine, "POST", "/submissions", None, vec![], Some(y2k())).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn invalid_submissions_report_fields() {
    let engine = engine().await;
    let mut form = y2k();
    form["title"] = json!("");
    form["email"] = json!("not-an-address");
    let member = user(Role::Member);

    let resp = call(&engine, "POST", "/submissions", Some(&member), vec![], Some(form)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["fields"]["title"].is_array());
    assert!(body["fields"]["notification_email"].is_array());
  }

  #[tokio::test]
  async fn submit_then_review() {
    let engine = engine().await;
    let member = user(Role::Member);
    let admin = user(Role::Administrator);

    let resp = call(&engine, "POST", "/submissions", Some(&member), vec![], Some(y2k())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    assert_eq!(created["status"], "under_review");
    let id = created["submission_id"].as_str().unwrap().to_owned();

    let submission_uri = format!("/submissions/{id}");
    let own = call(&engine, "GET", &submission_uri, Some(&member), vec![], None).await;
    assert_eq!(own.status(), StatusCode::OK);
    let other = user(Role::Member);
    let theirs = call(&engine, "GET", &submission_uri, Some(&other), vec![], None).await;
    assert_eq!(theirs.status(), StatusCode::FORBIDDEN);

    let review_uri = format!("/moderation/{id}/review");
    let approve = json!({ "decision": "approve", "notes": "checks out" });

    let resp =
      call(&engine, "POST", &review_uri, Some(&member), vec![], Some(approve.clone())).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = call(&engine, "POST", &review_uri, Some(&admin), vec![], Some(approve.clone())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let reviewed = json_body(resp).await;
    assert_eq!(reviewed["status"], "approved");
    assert_eq!(reviewed["review"]["reviewed_by"], admin.user_id.to_string());

    let resp = call(&engine, "POST", &review_uri, Some(&admin), vec![], Some(approve)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = call(&engine, "GET", "/results/1999", None, vec![], None).await;
    let body = json_body(resp).await;
    assert_eq!(body["facts"]["items"][0]["fact_type"], "user_submitted");
    assert_eq!(body["facts"]["items"][0]["title"], "Y2K fears");
  }

  #[tokio::test]
  async fn sixth_submission_is_rate_limited() {
    let engine = engine().await;
    let member = user(Role::Member);
    for _ in 0..5 {
      let resp = call(&engine, "POST", "/submissions", Some(&member), vec![], Some(y2k())).await;
      assert_eq!(resp.status(), StatusCode::CREATED);
    }
    let resp = call(&engine, "POST", "/submissions", Some(&member), vec![], Some(y2k())).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
  }

  #[tokio::test]
  async fn dashboard_is_admin_only() {
    let engine = engine().await;
    let resp = call(&engine, "GET", "/moderation", None, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = call(&engine, "GET", "/moderation", Some(&user(Role::Member)), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp =
      call(&engine, "GET", "/moderation", Some(&user(Role::Administrator)), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["sections"][0]["status"], "under_review");
  }
}
