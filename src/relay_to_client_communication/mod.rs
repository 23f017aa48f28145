/// The types of `relay -> client` communications this client reads.
///
///  - `["EVENT", subscription_id, event_JSON]`: events requested by clients
///
///  - `["EOSE", subscription_id]`: marks the end of stored events and the
///       beginning of events newly received in real-time
///
///  - `["OK", event_id, true|false, message]`: acceptance or rejection
///       report for a published event
///
///  - `["NOTICE", message]`: human-readable messages for the connected client
///
// internal modules
pub mod eose;
pub mod event;
pub mod notice;
pub mod ok;

use serde_json::Value;

use self::eose::RelayToClientCommEose;
use self::event::RelayToClientCommEvent;
use self::notice::RelayToClientCommNotice;
use self::ok::RelayToClientCommOk;

/// [`RelayToClientCommunication`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Error serializing or deserializing JSON data
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error("Invalid data")]
  InvalidData,
}

/// Any message a relay can send to this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayToClientMessage {
  Event(RelayToClientCommEvent),
  Eose(RelayToClientCommEose),
  Ok(RelayToClientCommOk),
  Notice(RelayToClientCommNotice),
}

impl RelayToClientMessage {
  /// Classifies a raw relay frame by its first element.
  /// Unknown or malformed frames are an `Err`, which callers skip.
  pub fn from_json<S>(msg: S) -> Result<Self, Error>
  where
    S: Into<String>,
  {
    let msg: &str = &msg.into();

    if msg.is_empty() {
      return Err(Error::InvalidData);
    }

    let value: Value = serde_json::from_str(msg)?;
    let code = value
      .as_array()
      .and_then(|v| v.first())
      .and_then(|code| code.as_str())
      .ok_or(Error::InvalidData)?;

    match code {
      "EVENT" => Ok(Self::Event(RelayToClientCommEvent::from_value(value)?)),
      "EOSE" => Ok(Self::Eose(RelayToClientCommEose::from_value(value)?)),
      "OK" => Ok(Self::Ok(RelayToClientCommOk::from_value(value)?)),
      "NOTICE" => Ok(Self::Notice(RelayToClientCommNotice::from_value(value)?)),
      _ => Err(Error::InvalidData),
    }
  }
}
