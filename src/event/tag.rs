use serde::de::Error as DeserializerError;
use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, vec};
use url::Url;

use super::{EventId, Marker, PubKey};

/// [`Tag`] error
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("kind invalid or not implemented")]
  KindNotFound,
}

/// Holds the value of a recommended relay URL
/// that is sent on an event, before any normalization.
///
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct UncheckedRecommendRelayURL(pub String);

impl UncheckedRecommendRelayURL {
  pub fn check_if_url(&self) -> bool {
    Url::parse(&self.0).is_ok()
  }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum TagKind {
  /// `["p", <pub-key> or <list-of-pub-keys-involved-in-the-reply-thread>, <relay-url>]`
  ///
  /// Records who is involved in a reply thread.
  PubKey,
  /// `["e", <event-id>, <relay-url>, <marker>]` (NIP-10)
  ///
  /// References another event. `<relay-url>` is an optional hint of where
  /// to find the referenced event; `<marker>` is optionally one of
  /// `root`, `reply` or `mention`.
  Event,
  /// Custom tag
  Custom(String),
}

impl fmt::Display for TagKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::PubKey => write!(f, "p"),
      Self::Event => write!(f, "e"),
      Self::Custom(tag) => write!(f, "{tag}"),
    }
  }
}

impl<S> From<S> for TagKind
where
  S: Into<String>,
{
  fn from(s: S) -> Self {
    let s: String = s.into();
    match s.as_str() {
      "p" => Self::PubKey,
      "e" => Self::Event,
      tag => Self::Custom(tag.to_string()),
    }
  }
}

impl From<Tag> for TagKind {
  fn from(data: Tag) -> Self {
    match data {
      Tag::Generic(kind, _) => kind,
      Tag::Event(_, _, _) => TagKind::Event,
      Tag::PubKey(_, _) => TagKind::PubKey,
    }
  }
}

/// A tag is an ordered array of strings whose meaning depends on its
/// first element (the [`TagKind`]).
///
/// `["p", <32-bytes hex of a key>, <recommended relay URL>]`
///
/// `["e", <32-bytes hex of the id of another event>, <recommended relay URL>, <marker>]`
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
  /// Generic because maybe the other client is sending a tag
  /// we don't have implemented yet.
  Generic(TagKind, Vec<String>),
  Event(EventId, Option<UncheckedRecommendRelayURL>, Option<Marker>),
  PubKey(Vec<PubKey>, Option<UncheckedRecommendRelayURL>),
}

impl Tag {
  pub fn as_str(&self) -> String {
    serde_json::to_string(self).unwrap()
  }

  pub fn from_string(data: String) -> Self {
    serde_json::from_str(&data).unwrap()
  }

  pub fn as_vec(&self) -> Vec<String> {
    self.clone().into()
  }

  pub fn from_vec(data: Vec<String>) -> Self {
    Self::try_from(data).unwrap()
  }
}

/// Helper to check a pubkey (`"p"`) tag. The last element is either a
/// relay URL (or the empty string) or one more pubkey of the thread.
fn match_pubkey_tag_helper(tag: Vec<String>) -> Result<Tag, Error> {
  // get all values up until last one (exclusive)
  let tag_len = tag.len();
  let mut tags = vec![tag[1..(tag_len - 1)].to_vec()].concat();

  let last_value = tag.last().unwrap();
  if last_value.is_empty() || UncheckedRecommendRelayURL(last_value.clone()).check_if_url() {
    Ok(Tag::PubKey(
      tags.clone(),
      (!last_value.is_empty()).then_some(UncheckedRecommendRelayURL(last_value.clone())),
    ))
  } else {
    tags.push(last_value.clone());
    Ok(Tag::PubKey(tags.clone(), None))
  }
}

impl<S> TryFrom<Vec<S>> for Tag
where
  S: Into<String>,
{
  type Error = Error;

  fn try_from(tag: Vec<S>) -> Result<Self, Self::Error> {
    let tag: Vec<String> = tag.into_iter().map(|v| v.into()).collect();
    let tag_len: usize = tag.len();
    let tag_kind: TagKind = match tag.first() {
      Some(kind) => TagKind::from(kind),
      None => return Err(Error::KindNotFound),
    };

    if tag_len == 1 {
      Ok(Self::Generic(tag_kind, vec![]))
    } else if tag_len == 2 {
      let content: String = tag[1].clone();
      match tag_kind {
        TagKind::PubKey => Ok(Self::PubKey(vec![content], None)),
        TagKind::Event => Ok(Self::Event(EventId(content), None, None)),
        _ => Ok(Self::Generic(tag_kind, vec![content])),
      }
    } else if tag_len == 3 {
      match tag_kind {
        TagKind::PubKey => match_pubkey_tag_helper(tag),
        TagKind::Event => Ok(Self::Event(
          EventId(tag[1].clone()),
          (!tag[2].is_empty()).then_some(UncheckedRecommendRelayURL(tag[2].clone())),
          None,
        )),
        _ => Ok(Self::Generic(tag_kind, tag[1..].to_vec())),
      }
    } else if tag_len == 4 {
      match tag_kind {
        TagKind::PubKey => match_pubkey_tag_helper(tag),
        TagKind::Event => Ok(Self::Event(
          EventId(tag[1].clone()),
          (!tag[2].is_empty()).then_some(UncheckedRecommendRelayURL(tag[2].clone())),
          (!tag[3].is_empty()).then_some(Marker::from(&tag[3])),
        )),
        _ => Ok(Self::Generic(tag_kind, tag[1..].to_vec())),
      }
    } else {
      match tag_kind {
        TagKind::PubKey => match_pubkey_tag_helper(tag),
        _ => Ok(Self::Generic(tag_kind, tag[1..].to_vec())),
      }
    }
  }
}

impl From<Tag> for Vec<String> {
  fn from(data: Tag) -> Self {
    match data {
      Tag::Generic(kind, content) => vec![vec![kind.to_string()], content].concat(),
      Tag::Event(event_id, recommended_relay_url, marker) => {
        let mut event_tag = vec![TagKind::Event.to_string(), event_id.0];

        if let Some(url) = recommended_relay_url {
          event_tag.push(url.0);
        }

        if let Some(marker) = marker {
          if event_tag.len() == 2 {
            event_tag.push("".to_string());
          }
          event_tag.push(marker.to_string());
        }

        event_tag
      }
      Tag::PubKey(pubkey, recommended_relay_url) => {
        let mut pubkey_tag = vec![vec![TagKind::PubKey.to_string()], pubkey].concat();

        if let Some(url) = recommended_relay_url {
          pubkey_tag.push(url.0);
        } else {
          pubkey_tag.push("".to_string());
        }

        pubkey_tag
      }
    }
  }
}

impl Serialize for Tag {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    // using the `impl From<Tag> for Vec<String>`
    let data: Vec<String> = self.as_vec();
    let mut seq = serializer.serialize_seq(Some(data.len()))?;
    for element in data.clone().into_iter() {
      // We don't want to send empty data when it is pubkey tags.
      // `Tag::PubKey(vec!["potato"], None)` serializes as
      // `["p", "potato"]` and not `["p", "potato", ""]`, because when
      // replying to an event we extend its "p" tag with more pubkeys and
      // empty strings in the middle would corrupt the list.
      if data.first().unwrap().contains('p') && element.is_empty() {
        continue;
      }
      seq.serialize_element(&element)?;
    }
    seq.end()
  }
}

impl<'de> Deserialize<'de> for Tag {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    type Data = Vec<String>;
    // Deserialize to something known first (a `Vec<String>`), then use
    // `impl TryFrom<Vec<S>> for Tag` to get the enum out of it.
    let vec: Vec<String> = Data::deserialize(deserializer)?;
    Self::try_from(vec).map_err(DeserializerError::custom)
  }
}
