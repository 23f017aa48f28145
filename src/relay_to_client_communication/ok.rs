use serde::{
  de::{Deserializer, Error as DeserializerError},
  ser::{SerializeSeq, Serializer},
  Deserialize, Serialize,
};
use serde_json::{json, Value};

use super::Error;

/// Used to report whether a published event was
/// accepted or rejected by the relay. The `message`
/// carries the relay's reason when rejected.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayToClientCommOk {
  pub code: String, // "OK"
  pub event_id: String,
  pub accepted: bool,
  pub message: String,
}

impl RelayToClientCommOk {
  pub fn new_ok(event_id: String, accepted: bool, message: String) -> Self {
    Self {
      event_id,
      accepted,
      message,
      ..Default::default()
    }
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(["OK", self.event_id, self.accepted, self.message])
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::InvalidData)?;

    if v.is_empty() || v.len() != 4 || v[0] != "OK" {
      return Err(Error::InvalidData);
    }

    let event_id = serde_json::from_value(v[1].clone())?;
    let accepted = v[2].as_bool().ok_or(Error::InvalidData)?;
    let message = serde_json::from_value(v[3].clone())?;

    Ok(Self {
      code: "OK".to_string(),
      event_id,
      accepted,
      message,
    })
  }

  /// Get [`RelayToClientCommOk`] as JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }

  /// Deserialize [`RelayToClientCommOk`] from JSON string
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

impl Default for RelayToClientCommOk {
  fn default() -> Self {
    Self {
      code: String::from("OK"),
      event_id: String::new(),
      accepted: false,
      message: String::new(),
    }
  }
}

impl Serialize for RelayToClientCommOk {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut seq = serializer.serialize_seq(Some(4))?;
    seq.serialize_element(&self.code)?;
    seq.serialize_element(&self.event_id)?;
    seq.serialize_element(&self.accepted)?;
    seq.serialize_element(&self.message)?;
    seq.end()
  }
}

impl<'de> Deserialize<'de> for RelayToClientCommOk {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    RelayToClientCommOk::from_value(value).map_err(DeserializerError::custom)
  }
}
