//! Library catalog lookups: works published in a year for a subject.

use std::future::Future;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
  Result, SourceError,
  http::{build_client, check_status, trim_base},
};

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// One catalog entry, with placeholders already filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogWork {
  pub title:    String,
  /// Never empty; a work without named authors gets `Unknown Author`.
  pub authors:  Vec<String>,
  /// Capitalized subject headings.
  pub subjects: Vec<String>,
  pub cover_id: Option<i64>,
}

impl CatalogWork {
  /// Authors joined for display.
  pub fn author_line(&self) -> String { self.authors.join(", ") }

  pub fn cover_url(&self) -> Option<String> {
    self
      .cover_id
      .map(|id| format!("https://covers.openlibrary.org/b/id/{id}-M.jpg"))
  }
}

pub trait LibraryCatalog: Send + Sync {
  /// Up to `limit` works about `subject` published in `year`.
  fn works<'a>(
    &'a self,
    year: i32,
    subject: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<CatalogWork>>> + Send + 'a;
}

// ─── Open Library ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SubjectResponse {
  #[serde(default)]
  works: Vec<RawWork>,
}

#[derive(Deserialize)]
struct RawWork {
  title:    Option<String>,
  #[serde(default)]
  authors:  Vec<RawAuthor>,
  #[serde(default)]
  subject:  Vec<String>,
  cover_id: Option<i64>,
}

#[derive(Deserialize)]
struct RawAuthor {
  name: Option<String>,
}

impl RawWork {
  fn into_work(self) -> CatalogWork {
    let mut authors: Vec<String> = self
      .authors
      .into_iter()
      .map(|a| a.name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()))
      .collect();
    if authors.is_empty() {
      authors.push(UNKNOWN_AUTHOR.to_owned());
    }

    CatalogWork {
      title: self.title.unwrap_or_else(|| UNKNOWN_TITLE.to_owned()),
      authors,
      subjects: self.subject.iter().map(|s| capitalize(s)).collect(),
      cover_id: self.cover_id,
    }
  }
}

/// First character uppercased, the rest lowercased.
fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

/// Subject path segment: lowercased with spaces as underscores.
fn subject_key(subject: &str) -> String { subject.trim().to_lowercase().replace(' ', "_") }

/// Open Library subjects API client.
#[derive(Clone)]
pub struct OpenLibraryClient {
  client:   Client,
  base_url: String,
}

impl OpenLibraryClient {
  pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
    Ok(Self { client: build_client(user_agent)?, base_url: trim_base(base_url) })
  }

  /// `{base}/subjects/{key}.json`, with the key percent-encoded as a single
  /// path segment.
  fn subject_url(&self, subject: &str) -> Result<Url> {
    let mut url =
      Url::parse(&self.base_url).map_err(|e| SourceError::Malformed(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|()| SourceError::Malformed(format!("cannot-be-a-base url: {}", self.base_url)))?
      .pop_if_empty()
      .extend(["subjects", format!("{}.json", subject_key(subject)).as_str()]);
    Ok(url)
  }
}

impl LibraryCatalog for OpenLibraryClient {
  async fn works(&self, year: i32, subject: &str, limit: usize) -> Result<Vec<CatalogWork>> {
    let resp = self
      .client
      .get(self.subject_url(subject)?)
      .query(&[("published_in", year.to_string()), ("limit", limit.to_string())])
      .send()
      .await?;

    let body: SubjectResponse = check_status(resp)?.json().await?;
    Ok(body.works.into_iter().take(limit).map(RawWork::into_work).collect())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
  };

  use super::*;

  #[test]
  fn subject_is_a_single_encoded_segment() {
    let catalog = OpenLibraryClient::new("https://openlibrary.org/", "NostalgiaTest/1.0").unwrap();
    let url = catalog.subject_url("Arts/Crafts? #1").unwrap();
    assert_eq!(url.as_str(), "https://openlibrary.org/subjects/arts%2Fcrafts%3F_%231.json");
    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
  }

  #[test]
  fn capitalize_like_a_heading() {
    assert_eq!(capitalize("science fiction"), "Science fiction");
    assert_eq!(capitalize("HISTORY"), "History");
    assert_eq!(capitalize(""), "");
  }

  #[tokio::test]
  async fn works_fill_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/subjects/science_fiction.json"))
      .and(query_param("published_in", "1965"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "works": [
          {
            "title": "Dune",
            "authors": [ { "name": "Frank Herbert" } ],
            "subject": [ "science fiction", "ecology" ],
            "cover_id": 42
          },
          { "authors": [ {} ] },
          { "title": "Orphan" }
        ]
      })))
      .mount(&server)
      .await;

    let catalog = OpenLibraryClient::new(&server.uri(), "NostalgiaTest/1.0").unwrap();
    let works = catalog.works(1965, "Science Fiction", 10).await.unwrap();
    assert_eq!(works.len(), 3);

    assert_eq!(works[0].author_line(), "Frank Herbert");
    assert_eq!(works[0].subjects, ["Science fiction", "Ecology"]);
    assert_eq!(
      works[0].cover_url().as_deref(),
      Some("https://covers.openlibrary.org/b/id/42-M.jpg")
    );

    assert_eq!(works[1].title, "Unknown Title");
    assert_eq!(works[1].authors, ["Unknown Author"]);
    assert_eq!(works[2].authors, ["Unknown Author"]);
    assert!(works[2].cover_url().is_none());
  }

  #[tokio::test]
  async fn works_respect_limit() {
    let server = MockServer::start().await;
    Mock::given(path("/subjects/fiction.json"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "works": [ { "title": "A" }, { "title": "B" }, { "title": "C" } ]
      })))
      .mount(&server)
      .await;

    let catalog = OpenLibraryClient::new(&server.uri(), "NostalgiaTest/1.0").unwrap();
    assert_eq!(catalog.works(2000, "fiction", 2).await.unwrap().len(), 2);
  }
}
