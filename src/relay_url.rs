use std::fmt;
use std::fmt::Write as _;

use log::warn;
use serde::{Deserialize, Serialize};
use url::Url;

/// [`RelayUrl`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Error parsing the URL
  #[error(transparent)]
  Parse(#[from] url::ParseError),
  #[error("Relay URL is empty")]
  Empty,
  #[error("Relay URL has no host")]
  MissingHost,
}

/// A relay address in normalized form.
///
/// Normalization is idempotent and the normalized string is the
/// dedup key everywhere relays are collected into a set:
///
///  - the scheme is always `wss://`, whatever the input carried
///  - default ports (80, 443) are omitted
///  - repeated path slashes are collapsed, the trailing one stripped
///  - query params are sorted, the fragment removed
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelayUrl(String);

impl RelayUrl {
  pub fn parse<S>(input: S) -> Result<Self, Error>
  where
    S: AsRef<str>,
  {
    let trimmed = input.as_ref().trim();
    if trimmed.is_empty() {
      return Err(Error::Empty);
    }

    let without_scheme = match trimmed.find("://") {
      Some(index) => &trimmed[index + 3..],
      None => trimmed,
    };

    let url = Url::parse(&format!("wss://{without_scheme}"))?;
    let host = url.host_str().ok_or(Error::MissingHost)?;

    let mut normalized = format!("wss://{host}");
    match url.port() {
      Some(80) | Some(443) | None => {}
      Some(port) => {
        let _ = write!(normalized, ":{port}");
      }
    }

    let mut path = String::with_capacity(url.path().len());
    for character in url.path().chars() {
      if character == '/' && path.ends_with('/') {
        continue;
      }
      path.push(character);
    }
    let path = path.trim_end_matches('/');
    normalized.push_str(path);

    let mut query_pairs: Vec<(String, String)> = url
      .query_pairs()
      .map(|(key, value)| (key.into_owned(), value.into_owned()))
      .collect();
    if !query_pairs.is_empty() {
      query_pairs.sort();
      let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query_pairs)
        .finish();
      let _ = write!(normalized, "?{query}");
    }

    Ok(Self(normalized))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for RelayUrl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<RelayUrl> for String {
  fn from(relay_url: RelayUrl) -> Self {
    relay_url.0
  }
}

/// Splits a newline-delimited relay configuration into normalized,
/// deduplicated URLs. Blank lines are skipped and lines that do not
/// parse are dropped with a warning. An empty configuration yields
/// an empty list, which callers treat as "no relays, no query".
pub fn parse_relay_list(config: &str) -> Vec<RelayUrl> {
  let mut relays: Vec<RelayUrl> = Vec::new();

  for line in config.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    match RelayUrl::parse(line) {
      Ok(relay_url) => {
        if !relays.contains(&relay_url) {
          relays.push(relay_url);
        }
      }
      Err(err) => warn!("Skipping relay URL {line:?}: {err}"),
    }
  }

  relays
}
