use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use super::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientToRelayCommClose {
  pub code: String, // "CLOSE"
  pub subscription_id: String,
}

impl ClientToRelayCommClose {
  pub fn new_close(subscription_id: String) -> Self {
    Self {
      code: "CLOSE".to_string(),
      subscription_id,
    }
  }

  /// Get close communication as JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }

  /// Deserialize [`ClientToRelayCommClose`] from JSON string
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
    json!(["CLOSE", self.subscription_id])
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::InvalidData)?;

    // Close
    // ["CLOSE", <subscription_id>]
    if v.len() != 2 || v[0] != "CLOSE" {
      return Err(Error::InvalidData);
    }

    let subscription_id: String = serde_json::from_value(v[1].clone())?;
    Ok(Self::new_close(subscription_id))
  }
}

impl Default for ClientToRelayCommClose {
  fn default() -> Self {
    Self {
      code: String::from("CLOSE"),
      subscription_id: String::new(),
    }
  }
}

impl Serialize for ClientToRelayCommClose {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    self.as_value().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for ClientToRelayCommClose {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let json_value: Value = Value::deserialize(deserializer)?;
    Self::from_value(json_value).map_err(serde::de::Error::custom)
  }
}
