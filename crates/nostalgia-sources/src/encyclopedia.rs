//! Encyclopedia lookups: title search and page summaries.

use std::future::Future;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::{
  Result, SourceError,
  http::{build_client, check_status, trim_base},
};

/// The parts of an encyclopedia page the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncyclopediaPage {
  pub title:   String,
  /// Plain-text lead section.
  pub summary: String,
  /// Canonical page URL.
  pub url:     String,
}

pub trait Encyclopedia: Send + Sync {
  /// Page titles matching `query`, best first, at most `limit`.
  fn search<'a>(
    &'a self,
    query: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<String>>> + Send + 'a;

  /// Fetch one page by exact title. Fails with [`SourceError::NotFound`] or
  /// [`SourceError::Ambiguous`] for pages that cannot be used.
  fn page<'a>(
    &'a self,
    title: &'a str,
  ) -> impl Future<Output = Result<EncyclopediaPage>> + Send + 'a;
}

// ─── MediaWiki ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchResponse {
  query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
  search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
  title: String,
}

#[derive(Deserialize)]
struct SummaryResponse {
  #[serde(rename = "type", default)]
  kind:         String,
  title:        String,
  #[serde(default)]
  extract:      String,
  content_urls: Option<ContentUrls>,
}

#[derive(Deserialize)]
struct ContentUrls {
  desktop: PageUrls,
}

#[derive(Deserialize)]
struct PageUrls {
  page: String,
}

/// MediaWiki client: the action API for search, the REST API for summaries.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct WikipediaClient {
  client:   Client,
  base_url: String,
}

impl WikipediaClient {
  pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
    Ok(Self { client: build_client(user_agent)?, base_url: trim_base(base_url) })
  }

  fn summary_url(&self, title: &str) -> Result<Url> {
    let mut url =
      Url::parse(&self.base_url).map_err(|e| SourceError::Malformed(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|()| SourceError::Malformed(format!("cannot-be-a-base url: {}", self.base_url)))?
      .pop_if_empty()
      .extend(["api", "rest_v1", "page", "summary", title.replace(' ', "_").as_str()]);
    Ok(url)
  }
}

impl Encyclopedia for WikipediaClient {
  async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
    let limit = limit.to_string();
    let resp = self
      .client
      .get(format!("{}/w/api.php", self.base_url))
      .query(&[
        ("action", "query"),
        ("list", "search"),
        ("srsearch", query),
        ("srlimit", limit.as_str()),
        ("format", "json"),
      ])
      .send()
      .await?;

    let body: SearchResponse = check_status(resp)?.json().await?;
    Ok(body.query.search.into_iter().map(|hit| hit.title).collect())
  }

  async fn page(&self, title: &str) -> Result<EncyclopediaPage> {
    let resp = self.client.get(self.summary_url(title)?).send().await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Err(SourceError::NotFound(title.to_owned()));
    }

    let body: SummaryResponse = check_status(resp)?.json().await?;
    if body.kind == "disambiguation" {
      return Err(SourceError::Ambiguous(body.title));
    }

    let url = body
      .content_urls
      .map(|u| u.desktop.page)
      .ok_or_else(|| SourceError::Malformed(format!("summary of {title:?} has no page url")))?;

    Ok(EncyclopediaPage { title: body.title, summary: body.extract, url })
  }
}
