use serde::{
  de::{Deserializer, Error as DeserializerError},
  ser::{SerializeSeq, Serializer},
  Deserialize, Serialize,
};
use serde_json::{json, Value};

use super::Error;

/// Used to send human-readable messages to clients.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayToClientCommNotice {
  pub code: String, // "NOTICE"
  pub message: String,
}

impl RelayToClientCommNotice {
  pub fn new_notice(message: String) -> Self {
    Self {
      message,
      ..Default::default()
    }
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(["NOTICE", self.message])
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::InvalidData)?;

    if v.is_empty() || v.len() != 2 || v[0] != "NOTICE" {
      return Err(Error::InvalidData);
    }

    let message = serde_json::from_value(v[1].clone())?;

    Ok(Self {
      code: "NOTICE".to_string(),
      message,
    })
  }

  /// Get [`RelayToClientCommNotice`] as JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }

  /// Deserialize [`RelayToClientCommNotice`] from JSON string
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

impl Default for RelayToClientCommNotice {
  fn default() -> Self {
    Self {
      code: String::from("NOTICE"),
      message: String::new(),
    }
  }
}

impl Serialize for RelayToClientCommNotice {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut seq = serializer.serialize_seq(Some(2))?;
    seq.serialize_element(&self.code)?;
    seq.serialize_element(&self.message)?;
    seq.end()
  }
}

impl<'de> Deserialize<'de> for RelayToClientCommNotice {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    RelayToClientCommNotice::from_value(value).map_err(DeserializerError::custom)
  }
}
