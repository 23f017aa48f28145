use std::str::FromStr;

use secp256k1::{schnorr, Secp256k1};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Event Modules
pub mod id;
pub mod kind;
pub mod marker;
pub mod tag;

use self::id::EventId;
use self::kind::EventKind;
use self::marker::Marker;
use self::tag::Tag;

pub type PubKey = String;
pub type Timestamp = u64;

/// [`Event`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Error serializing or deserializing JSON data
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error("Invalid data")]
  InvalidData,
}

///
/// Event is the only object that exists in the Nostr protocol.
///
/// Example (ids and other hashes are not valid for the information presented):
///   ```json
///   {
///     "id": "ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb",
///     "pubkey": "02c7e1b1e9c175ab2d100baf1d5a66e73ecc044e9f8093d0c965741f26aa3abf76",
///     "created_at": 1673002822,
///     "kind": 1,
///     "tags": [
///       ["e", "688787d8ff144c502c7f5cffaafe2cc588d86079f9de88304c26b0cb99ce91c6", "wss://relay.damus.io", "root"],
///       ["p", "02c7e1b1e9c175ab2d100baf1d5a66e73ecc044e9f8093d0c965741f26aa3abf76", ""],
///     ],
///     "content": "Lorem ipsum dolor sit amet",
///     "sig": "e8551d85f530113366e8da481354c2756605e3f58149cedc1fb9385d35251712b954af8ef891cb0467d50ddc6685063d4190c97e9e131f903e6e4176dc13ce7c"
///   }
///   ```
///
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Event {
  /// 32-bytes SHA256 of the serialized event data
  pub id: String,
  /// 32-bytes hex-encoded public key of the event creator
  pub pubkey: PubKey,
  /// Unix timestamp in seconds
  pub created_at: Timestamp,
  /// Kind of event
  pub kind: EventKind,
  /// An array of arrays with more info about the event,
  /// like, for example, if it is replying to someone.
  pub tags: Vec<Tag>,
  /// Arbitrary string. Meaning depends on the kind of the event.
  pub content: String,
  /// 64-bytes hex signature of the id field
  pub sig: String,
}

impl Event {
  pub fn new_without_signature(
    pubkey: PubKey,
    created_at: Timestamp,
    kind: EventKind,
    tags: Vec<Tag>,
    content: String,
  ) -> Self {
    let id = EventId::new(
      pubkey.clone(),
      created_at,
      kind,
      tags.clone(),
      content.clone(),
    );
    Self {
      id: id.0,
      pubkey,
      created_at,
      kind,
      tags,
      content,
      ..Default::default()
    }
  }

  /// Signs the event id with the given secret key.
  /// On failure the event is left unsigned (empty `sig`) and a warning
  /// is logged; callers check [`Event::check_event_signature`] before
  /// relying on the output.
  pub fn sign_event(&mut self, seckey: &[u8]) {
    let secp = Secp256k1::new();
    let msg = self.id.clone();
    match crate::schnorr::sign_schnorr(&secp, msg, seckey) {
      Ok(signed) => self.sig = signed.to_string(),
      Err(err) => log::warn!("[sign_event] event left unsigned: {err}"),
    }
  }

  pub fn check_event_id(&self) -> bool {
    EventId::new(
      self.pubkey.clone(),
      self.created_at,
      self.kind,
      self.tags.clone(),
      self.content.clone(),
    )
    .0 == self.id
  }

  pub fn check_event_signature(&self) -> bool {
    let secp = Secp256k1::new();
    let sig = match schnorr::Signature::from_str(&self.sig) {
      Ok(signature) => signature,
      Err(_) => return false,
    };
    let msg = self.id.clone();

    crate::schnorr::verify_schnorr(&secp, msg, sig, self.pubkey.clone()).unwrap_or(false)
  }

  /// An event is valid iff recomputing the hash reproduces `id`
  /// AND the signature verifies against `pubkey`.
  /// Malformed events verify false, never raise.
  pub fn verify(&self) -> bool {
    self.check_event_id() && self.check_event_signature()
  }

  /// Deserializes from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    serde_json::from_value(msg).map_err(Error::Json)
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(self)
  }

  /// Deserialize [`Event`] from JSON string
  pub fn from_json<S>(msg: S) -> Result<Self, Error>
  where
    S: Into<String>,
  {
    let msg: &str = &msg.into();

    if msg.is_empty() {
      return Err(Error::InvalidData);
    }

    let value: Value = serde_json::from_str(msg)?;
    Self::from_value(value)
  }

  /// Get [`Event`] in JSON string
  pub fn as_json(&self) -> String {
    serde_json::to_string(self).unwrap()
  }
}
