use serde::{
  de::{Deserializer, Error as DeserializerError},
  ser::{SerializeSeq, Serializer},
  Deserialize, Serialize,
};
use serde_json::{json, Value};

use super::Error;

/// Used to indicate the End Of Stored Events (EOSE)
/// and the beginning of events newly received in
/// real-time.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayToClientCommEose {
  pub code: String, // "EOSE"
  pub subscription_id: String,
}

impl RelayToClientCommEose {
  pub fn new_eose(subscription_id: String) -> Self {
    Self {
      subscription_id,
      ..Default::default()
    }
  }

  /// Serialize as [`Value`]
  pub fn as_value(&self) -> Value {
    json!(["EOSE", self.subscription_id])
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::InvalidData)?;

    if v.is_empty() || v.len() != 2 || v[0] != "EOSE" {
      return Err(Error::InvalidData);
    }

    let subscription_id = serde_json::from_value(v[1].clone())?;

    Ok(Self {
      code: "EOSE".to_string(),
      subscription_id,
    })
  }

  /// Get [`RelayToClientCommEose`] as JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }

  /// Deserialize [`RelayToClientCommEose`] from JSON string
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

impl Default for RelayToClientCommEose {
  fn default() -> Self {
    Self {
      code: String::from("EOSE"),
      subscription_id: String::new(),
    }
  }
}

impl Serialize for RelayToClientCommEose {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut seq = serializer.serialize_seq(Some(2))?;
    seq.serialize_element(&self.code)?;
    seq.serialize_element(&self.subscription_id)?;
    seq.end()
  }
}

impl<'de> Deserialize<'de> for RelayToClientCommEose {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    RelayToClientCommEose::from_value(value).map_err(DeserializerError::custom)
  }
}
