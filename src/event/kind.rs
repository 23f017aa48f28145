use serde::de::{Deserialize, Deserializer, Error, Visitor};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Defines the type of the event.
/// Different types will change the meaning of different keys
/// of the event object. `Text` is the default.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
  /// The content is set to a stringified JSON object
  /// describing the user who created the event
  /// (see [`crate::event_service::MetadataPayload`]).
  /// A relay may delete past `Metadata` events once it gets a new one
  /// from the same pubkey.
  Metadata,
  /// The content is set to the plaintext content of a note
  /// (anything the user wants to say).
  #[default]
  Text,
  /// The content is set to the URL (e.g.: `wss://somerelay.com`) of a relay
  /// the event creator wants to recommend to its followers.
  RecommendRelay,
  /// The content is an encrypted direct message addressed to the
  /// pubkey in the `p` tag.
  EncryptedDirectMessage,
  /// A kind we haven't implemented yet.
  Custom(u64),
}

impl FromStr for EventKind {
  type Err = ParseIntError;
  fn from_str(event_kind: &str) -> Result<Self, Self::Err> {
    let event_kind: u64 = event_kind.parse()?;
    Ok(Self::from(event_kind))
  }
}

impl From<u64> for EventKind {
  fn from(u: u64) -> Self {
    match u {
      0 => Self::Metadata,
      1 => Self::Text,
      2 => Self::RecommendRelay,
      4 => Self::EncryptedDirectMessage,
      x => Self::Custom(x),
    }
  }
}

impl From<EventKind> for u64 {
  fn from(e: EventKind) -> u64 {
    match e {
      EventKind::Metadata => 0,
      EventKind::Text => 1,
      EventKind::RecommendRelay => 2,
      EventKind::EncryptedDirectMessage => 4,
      EventKind::Custom(u) => u,
    }
  }
}

impl Serialize for EventKind {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_u64(From::from(*self))
  }
}

struct EventKindVisitor;

impl Visitor<'_> for EventKindVisitor {
  type Value = EventKind;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "an unsigned number of maximum length of 64 bits")
  }

  fn visit_u64<E>(self, v: u64) -> Result<EventKind, E>
  where
    E: Error,
  {
    Ok(From::<u64>::from(v))
  }
}

impl<'de> Deserialize<'de> for EventKind {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    deserializer.deserialize_u64(EventKindVisitor)
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", u64::from(*self))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  #[test]
  fn maps_kind_numbers_both_ways() {
    assert_eq!(EventKind::from(0u64), EventKind::Metadata);
    assert_eq!(EventKind::from(1u64), EventKind::Text);
    assert_eq!(EventKind::from(4u64), EventKind::EncryptedDirectMessage);
    assert_eq!(EventKind::from(30023u64), EventKind::Custom(30023));

    assert_eq!(u64::from(EventKind::Metadata), 0);
    assert_eq!(u64::from(EventKind::EncryptedDirectMessage), 4);
    assert_eq!(u64::from(EventKind::Custom(30023)), 30023);
  }

  #[test]
  fn serializes_as_plain_number() {
    assert_eq!(serde_json::json!(EventKind::Text).to_string(), "1");
    let kind: EventKind = serde_json::from_str("4").unwrap();
    assert_eq!(kind, EventKind::EncryptedDirectMessage);
  }
}
