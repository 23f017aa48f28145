use serde::{
  de::{Deserializer, Error as DeserializerError},
  ser::{SerializeSeq, Serializer},
  Deserialize, Serialize,
};
use serde_json::{json, Value};

use crate::event::Event;

use super::Error;

/// Used to forward requested events to clients.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayToClientCommEvent {
  pub code: String, // "EVENT"
  pub subscription_id: String,
  pub event: Event,
}

impl RelayToClientCommEvent {
  pub fn new_event(subscription_id: String, event: Event) -> Self {
    Self {
      subscription_id,
      event,
      ..Default::default()
    }
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(["EVENT", self.subscription_id, self.event])
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::InvalidData)?;

    if v.is_empty() || v.len() != 3 || v[0] != "EVENT" {
      return Err(Error::InvalidData);
    }

    let subscription_id = serde_json::from_value(v[1].clone())?;
    let event = serde_json::from_value(v[2].clone())?;

    Ok(Self {
      code: "EVENT".to_string(),
      subscription_id,
      event,
    })
  }

  /// Get [`RelayToClientCommEvent`] as JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }

  /// Deserialize [`RelayToClientCommEvent`] from JSON string
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
}

impl Default for RelayToClientCommEvent {
  fn default() -> Self {
    Self {
      code: String::from("EVENT"),
      subscription_id: String::new(),
      event: Event::default(),
    }
  }
}

impl Serialize for RelayToClientCommEvent {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut seq = serializer.serialize_seq(Some(3))?;
    seq.serialize_element(&self.code)?;
    seq.serialize_element(&self.subscription_id)?;
    seq.serialize_element(&self.event)?;
    seq.end()
  }
}

impl<'de> Deserialize<'de> for RelayToClientCommEvent {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    RelayToClientCommEvent::from_value(value).map_err(DeserializerError::custom)
  }
}

#[cfg(test)]
mod tests {
  use crate::event::kind::EventKind;

  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  struct EvtSut {
    mock_event: Event,
    mock_subscription_id: String,
  }

  impl EvtSut {
    fn new() -> Self {
      let mock_event = Event {
        id: "05b25af3-4250-4fbf-8ef5-97220858f9ab".to_string(),
        pubkey: "02c7e1b1e9c175ab2d100baf1d5a66e4ecf1e40102fb4b3b07f7981b8fc8ba333e".to_string(),
        created_at: 1673002822,
        kind: EventKind::Text,
        tags: vec![],
        content: "potato".to_string(),
        sig: "e8551d85f530113366e8da481354c2756605e3f58149cedc1fb9385d35251712b954af8ef891cb0467d50ddc6685063d4190c97e9e131f903e6e4176dc13ce7c".to_string(),
      };

      Self {
        mock_event,
        mock_subscription_id: "mock_subscription_id".to_string(),
      }
    }
  }

  #[test]
  fn test_relay_to_client_comm_event_as_json() {
    let sut = EvtSut::new();

    let event = RelayToClientCommEvent::new_event(
      sut.mock_subscription_id.clone(),
      sut.mock_event.clone(),
    );

    let expected = json!(["EVENT", sut.mock_subscription_id, sut.mock_event]).to_string();

    assert_eq!(expected, event.as_json());
  }

  #[test]
  fn test_relay_to_client_comm_event_from_json() {
    let sut = EvtSut::new();

    let event = RelayToClientCommEvent::new_event(
      sut.mock_subscription_id.clone(),
      sut.mock_event.clone(),
    );

    let from_json = RelayToClientCommEvent::from_json(event.as_json()).unwrap();

    assert_eq!(from_json, event);
  }

  #[test]
  fn test_relay_to_client_comm_event_from_json_malformed() {
    assert!(RelayToClientCommEvent::from_json("").is_err());
    assert!(RelayToClientCommEvent::from_json(r#"["EVENT","subid"]"#).is_err());
    assert!(RelayToClientCommEvent::from_json(r#"["EOSE","subid"]"#).is_err());
  }
}
