use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::filter::Filter;

use super::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientToRelayCommRequest {
  pub code: String, // "REQ"
  pub subscription_id: String,
  pub filters: Vec<Filter>,
}

impl ClientToRelayCommRequest {
  pub fn new_request(subscription_id: String, filters: Vec<Filter>) -> Self {
    Self {
      code: "REQ".to_string(),
      subscription_id,
      filters,
    }
  }

  /// Get request communication as JSON string
  pub fn as_json(&self) -> String {
    self.as_value().to_string()
  }

  /// Deserialize [`ClientToRelayCommRequest`] from JSON string
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

  /// Serialize as [`Value`].
  /// Filters travel as plain JSON objects:
  /// `["REQ", <subscription_id>, <filter JSON>, <filter JSON>, ...]`
  pub fn as_value(&self) -> Value {
    let mut elements = vec![json!("REQ"), json!(self.subscription_id)];
    for filter in &self.filters {
      elements.push(json!(filter));
    }
    Value::Array(elements)
  }

  /// Deserialize from [`Value`]
  pub fn from_value(msg: Value) -> Result<Self, Error> {
    let v = msg.as_array().ok_or(Error::InvalidData)?;

    if v.len() < 3 || v[0] != "REQ" {
      return Err(Error::InvalidData);
    }

    let subscription_id: String = serde_json::from_value(v[1].clone())?;
    let mut filters: Vec<Filter> = vec![];
    for filter in v[2..].iter() {
      filters.push(serde_json::from_value(filter.clone())?);
    }

    Ok(Self::new_request(subscription_id, filters))
  }
}

impl Default for ClientToRelayCommRequest {
  fn default() -> Self {
    Self {
      code: String::from("REQ"),
      subscription_id: String::new(),
      filters: vec![],
    }
  }
}

impl Serialize for ClientToRelayCommRequest {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let data = self.as_value();
    let elements = data.as_array().unwrap();
    let mut seq = serializer.serialize_seq(Some(elements.len()))?;
    for element in elements {
      seq.serialize_element(element)?;
    }
    seq.end()
  }
}

impl<'de> Deserialize<'de> for ClientToRelayCommRequest {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let json_value: Value = Value::deserialize(deserializer)?;
    Self::from_value(json_value).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use crate::event::{id::EventId, kind::EventKind};

  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  fn make_sut() -> (ClientToRelayCommRequest, Filter) {
    let mock_filter = Filter {
      ids: Some(vec![EventId(String::from(
        "05b25af3-4250-4fbf-8ef5-97220858f9ab",
      ))]),
      kinds: Some(vec![EventKind::Text]),
      ..Default::default()
    };

    let mock_client_request = ClientToRelayCommRequest {
      code: "REQ".to_string(),
      subscription_id: "mock_subscription_id".to_string(),
      filters: vec![mock_filter.clone()],
    };

    (mock_client_request, mock_filter)
  }

  #[test]
  fn default_is_an_empty_request() {
    let expected = ClientToRelayCommRequest {
      code: "REQ".to_owned(),
      subscription_id: "".to_owned(),
      filters: vec![],
    };

    assert_eq!(expected, ClientToRelayCommRequest::default());
  }

  #[test]
  fn as_json_has_the_wire_shape() {
    let (mock_client_request, mock_filter) = make_sut();

    let expected = json!(["REQ", "mock_subscription_id", mock_filter]).to_string();

    assert_eq!(expected, mock_client_request.as_json());
  }

  #[test]
  fn from_json_round_trips() {
    let (mock_client_request, _) = make_sut();

    let result = ClientToRelayCommRequest::from_json(mock_client_request.as_json()).unwrap();

    assert_eq!(result, mock_client_request);
  }

  #[test]
  fn rejects_malformed_messages() {
    assert!(ClientToRelayCommRequest::from_json("").is_err());
    assert!(ClientToRelayCommRequest::from_json(r#"["REQ","subid"]"#).is_err());
    assert!(ClientToRelayCommRequest::from_json(r#"["EVENT","subid",{}]"#).is_err());
  }
}
