//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::{Result, SourceError};

/// Sent as `User-Agent` unless configuration overrides it.
pub const DEFAULT_USER_AGENT: &str = "NostalgiaSite/1.0";

const TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client(user_agent: &str) -> Result<Client> {
  Ok(
    Client::builder()
      .user_agent(user_agent)
      .timeout(TIMEOUT)
      .build()?,
  )
}

pub(crate) fn trim_base(base_url: &str) -> String {
  base_url.trim_end_matches('/').to_owned()
}

/// Fail on any non-success status, keeping the URL for the log line.
pub(crate) fn check_status(resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    Ok(resp)
  } else {
    Err(SourceError::Status { status: status.as_u16(), url: resp.url().to_string() })
  }
}
