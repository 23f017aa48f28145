use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::event::{Event, PubKey};
use crate::session::DisplayInfo;

/// Signals crossing from this subsystem to the UI boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiSignal {
  /// Raised on the 0 -> 1 transition of the outstanding-operation
  /// counter, cleared on the transition back to 0.
  Busy(bool),
  /// Cached display data changed and rendered content is stale.
  Refresh,
}

/// Result of handing a batch of events to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveOutcome {
  pub saved_count: u64,
  pub event_node_ids: Vec<String>,
}

/// Backend calls that durably store validated events and derived
/// user info.
///
/// No typed errors cross this boundary: failures surface as `false`
/// acks, a zeroed [`SaveOutcome`] or an empty relay config, and the
/// caller carries on with stale local state.
#[async_trait]
pub trait PersistenceBridge: Send + Sync {
  async fn save_events(
    &self,
    events: Vec<Event>,
    derived_user_info: HashMap<PubKey, DisplayInfo>,
  ) -> SaveOutcome;

  async fn save_public_identity(&self, encoded_public_key: String, raw_public_key: String)
    -> bool;

  async fn get_user_relay_config(&self, owner_id: String) -> String;

  async fn save_relay_config(&self, relay_list: String) -> bool;
}
