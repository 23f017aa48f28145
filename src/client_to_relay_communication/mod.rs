/// The three types of `client -> relay` communications.
///
///  - `["EVENT", event_JSON]`: used to publish events
///
///  - `["REQ", subscription_id, filters_JSON]`: used to request events.
///       A REQ message may contain multiple filters; events that match any
///       of them are to be returned (`||` conditions).
///
///  - `["CLOSE", subscription_id]`: used to stop a previous subscription.
///    `subscription_id` is a random string used to represent a subscription.
///
// Internal `client_to_relay_communication` modules
pub mod close;
pub mod event;
pub mod request;

/// [`ClientToRelayCommunication`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// Error serializing or deserializing JSON data
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error("Invalid data")]
  InvalidData,
}

impl serde::de::Error for Error {
  fn custom<T>(_msg: T) -> Self
  where
    T: std::fmt::Display,
  {
    Self::InvalidData
  }
}
