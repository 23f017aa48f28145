use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::event::Event;

use super::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientToRelayCommEvent {
  pub code: String, // "EVENT"
  pub event: Event,
}

impl ClientToRelayCommEvent {
  pub fn new_event(event: Event) -> Self {
    Self {
      code: "EVENT".to_string(),
      event,
    }
  }

  /// Get event communication as JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }

  /// Deserialize [`ClientToRelayCommEvent`] from JSON string
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

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(["EVENT", self.event])
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::InvalidData)?;

    // Event
    // ["EVENT", <event JSON>]
    if v.len() != 2 || v[0] != "EVENT" {
      return Err(Error::InvalidData);
    }

    let event: Event = serde_json::from_value(v[1].clone())?;
    Ok(Self::new_event(event))
  }
}

impl Default for ClientToRelayCommEvent {
  fn default() -> Self {
    Self {
      code: String::from("EVENT"),
      event: Event::default(),
    }
  }
}

impl Serialize for ClientToRelayCommEvent {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let json_value: Value = self.as_value();
    json_value.serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for ClientToRelayCommEvent {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let json_value: Value = Value::deserialize(deserializer)?;
    ClientToRelayCommEvent::from_value(json_value).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  fn make_sut() -> (Event, ClientToRelayCommEvent) {
    let mock_event = Event {
      id: String::from("05b25af3-4250-4fbf-8ef5-97220858f9ab"),
      ..Default::default()
    };

    let mock_client_event = ClientToRelayCommEvent {
      code: "EVENT".to_string(),
      event: mock_event.clone(),
    };

    (mock_event, mock_client_event)
  }

  #[test]
  fn default_is_an_empty_event_message() {
    let expected = ClientToRelayCommEvent {
      code: "EVENT".to_owned(),
      event: Event::default(),
    };

    assert_eq!(expected, ClientToRelayCommEvent::default());
  }

  #[test]
  fn as_json_and_from_json_round_trip() {
    let (mock_event, mock_client_event) = make_sut();

    let from_json = json!(["EVENT", mock_event.as_value()]).to_string();
    let result = ClientToRelayCommEvent::from_json(from_json).unwrap();
    assert_eq!(result, mock_client_event);

    let round_tripped = ClientToRelayCommEvent::from_json(mock_client_event.as_json()).unwrap();
    assert_eq!(round_tripped, mock_client_event);
  }

  #[test]
  fn rejects_malformed_messages() {
    assert!(ClientToRelayCommEvent::from_json("").is_err());
    assert!(ClientToRelayCommEvent::from_json(r#"["REQ","subid"]"#).is_err());
    assert!(ClientToRelayCommEvent::from_json(r#"{"not":"an array"}"#).is_err());
  }
}
