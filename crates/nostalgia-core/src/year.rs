//! Graduation-year bounds shared by submissions and result requests.

use chrono::{DateTime, Datelike, Utc};

use crate::{Error, Result};

/// Earliest graduation year the service knows anything about.
pub const MIN_YEAR: i32 = 1900;

/// Accept `year` if it lies in `[MIN_YEAR, now.year()]`.
pub fn validate_year(year: i32, now: DateTime<Utc>) -> Result<i32> {
  let max = now.year();
  if (MIN_YEAR..=max).contains(&year) {
    Ok(year)
  } else {
    Err(Error::YearOutOfRange { year, min: MIN_YEAR, max })
  }
}
