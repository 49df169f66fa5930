//! Sentence helpers for encyclopedia summaries.
//!
//! A "sentence" is whatever lies between `". "` separators. This is crude
//! but matches how summaries are written often enough to be useful, and it
//! never splits on decimal points or abbreviations without a following space.

/// Text before the first `". "`, trimmed.
pub fn first_sentence(text: &str) -> &str {
  text.split(". ").next().unwrap_or_default().trim()
}

/// The second sentence, if there is a non-blank one.
pub fn second_sentence(text: &str) -> Option<&str> {
  text
    .split(". ")
    .nth(1)
    .map(str::trim)
    .filter(|s| !s.is_empty())
}

/// The first `n` sentences joined back together, always ending in a period.
pub fn first_sentences(text: &str, n: usize) -> String {
  let joined = text
    .split(". ")
    .take(n)
    .collect::<Vec<_>>()
    .join(". ");
  let joined = joined.trim();
  if joined.is_empty() || joined.ends_with('.') {
    joined.to_owned()
  } else {
    format!("{joined}.")
  }
}

/// Prefix `In {year}, ` unless the sentence already names the year.
pub fn with_year_prefix(sentence: &str, year: i32) -> String {
  let y = year.to_string();
  if sentence.contains(&y) {
    sentence.to_owned()
  } else {
    format!("In {y}, {sentence}")
  }
}

/// Whether `title`, or the first 500 characters of `summary`, mention `year`.
pub fn mentions_year(title: &str, summary: &str, year: i32) -> bool {
  let y = year.to_string();
  let head = summary
    .char_indices()
    .nth(500)
    .map_or(summary, |(i, _)| &summary[..i]);
  title.contains(&y) || head.contains(&y)
}
