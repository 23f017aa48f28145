use bitcoin_hashes::{sha256, Hash};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{kind::EventKind, tag::Tag, PubKey, Timestamp};

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EventId(pub String);

impl EventId {
  ///
  /// 32-bytes lowercase hex-encoded sha256 of the serialized event data:
  /// `[0, pubkey, created_at, kind, tags, content]`.
  /// This will equal `event.id`.
  ///
  /// <https://github.com/nostr-protocol/nips/blob/master/01.md>
  ///
  pub(crate) fn new(
    pubkey: PubKey,
    created_at: Timestamp,
    kind: EventKind,
    tags: Vec<Tag>,
    content: String,
  ) -> Self {
    let data = json!([0, pubkey, created_at, kind, tags, content]).to_string();

    let hash = sha256::Hash::hash(data.as_bytes());
    Self(hash.to_string())
  }
}

#[cfg(test)]
mod tests {
  use crate::event::{marker::Marker, tag::UncheckedRecommendRelayURL};

  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  #[test]
  fn creates_id() {
    let mock_pub_key: PubKey = String::from("mockpubkey");
    let mock_created_at: Timestamp = 161500343030;
    let mock_kind: EventKind = EventKind::Text;
    let mock_tags: Vec<Tag> = vec![Tag::Event(
      EventId(String::from("event_im_replying_to")),
      Some(UncheckedRecommendRelayURL(String::from(
        "wss://recommended.relay.com",
      ))),
      Some(Marker::Reply),
    )];
    let mock_content: String = String::from("mockcontent");

    let event_id = EventId::new(
      mock_pub_key.clone(),
      mock_created_at,
      mock_kind,
      mock_tags.clone(),
      mock_content.clone(),
    );

    let serialized = json!([
      0,
      mock_pub_key,
      mock_created_at,
      mock_kind,
      mock_tags,
      mock_content
    ])
    .to_string();
    let expected = EventId(sha256::Hash::hash(serialized.as_bytes()).to_string());

    let tampered = json!([
      1,
      mock_pub_key,
      mock_created_at,
      mock_kind,
      mock_tags,
      mock_content
    ])
    .to_string();
    let not_expected = EventId(sha256::Hash::hash(tampered.as_bytes()).to_string());

    assert_eq!(expected, event_id);
    assert_ne!(not_expected, event_id);
  }

  #[test]
  fn id_is_deterministic() {
    let first = EventId::new(
      String::from("pubkey"),
      1673002822,
      EventKind::Metadata,
      vec![],
      String::from("{\"name\":\"potato\"}"),
    );
    let second = EventId::new(
      String::from("pubkey"),
      1673002822,
      EventKind::Metadata,
      vec![],
      String::from("{\"name\":\"potato\"}"),
    );

    assert_eq!(first, second);
  }
}
