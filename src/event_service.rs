use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::database::events_table::{EventRecord, EventsTable};
use crate::database::markers_table::MarkersTable;
use crate::database::metadata_table::MetadataTable;
use crate::event::kind::EventKind;
use crate::event::tag::Tag;
use crate::event::{Event, PubKey};
use crate::identity::IdentityManager;
use crate::session::{DisplayInfo, Session};

#[cfg(not(test))]
fn get_time_now() -> SystemTime {
  SystemTime::now()
}

#[allow(dead_code)]
const SECONDS_AFTER_UNIX_EPOCH_FOR_TIME_NOW_CONFIG_TEST: u64 = 20u64;
#[cfg(test)]
fn get_time_now() -> SystemTime {
  UNIX_EPOCH + Duration::new(SECONDS_AFTER_UNIX_EPOCH_FOR_TIME_NOW_CONFIG_TEST, 0)
}

/// The JSON carried as `content` of a metadata event.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPayload {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub about: String,
  #[serde(default)]
  pub picture: String,
  #[serde(default)]
  pub banner: String,
  #[serde(default)]
  pub website: String,
  #[serde(default)]
  pub nip05: String,
  #[serde(default)]
  pub display_name: String,
  #[serde(default)]
  pub reactions: bool,
}

impl MetadataPayload {
  pub fn as_json(&self) -> String {
    json!(self).to_string()
  }

  pub fn from_json(content: &str) -> Option<Self> {
    serde_json::from_str(content).ok()
  }
}

/// A short render label for a pubkey with no resolved metadata.
pub fn truncated_pubkey(pubkey: &str) -> String {
  match pubkey.char_indices().nth(10) {
    Some((at, _)) => format!("{}…", &pubkey[..at]),
    None => pubkey.to_string(),
  }
}

/// Derives render-ready display data from a metadata event.
/// Falls back field by field when the payload is sparse or does not
/// parse at all.
pub fn derive_display_info(event: &Event) -> DisplayInfo {
  let payload = MetadataPayload::from_json(&event.content).unwrap_or_default();

  let display = [payload.display_name, payload.name, payload.username]
    .into_iter()
    .find(|candidate| !candidate.is_empty())
    .unwrap_or_else(|| truncated_pubkey(&event.pubkey));

  let title = if payload.nip05.is_empty() {
    payload.website
  } else {
    payload.nip05
  };

  DisplayInfo {
    display,
    title,
    picture: payload.picture,
  }
}

/// Builds, signs, verifies and locally caches protocol events.
pub struct EventService {
  session: Arc<Session>,
  identity: Arc<Mutex<IdentityManager>>,
  events_table: EventsTable,
  metadata_table: MetadataTable,
  markers_table: MarkersTable,
}

impl EventService {
  pub fn new(
    session: Arc<Session>,
    identity: Arc<Mutex<IdentityManager>>,
    events_table: EventsTable,
    metadata_table: MetadataTable,
    markers_table: MarkersTable,
  ) -> Self {
    Self {
      session,
      identity,
      events_table,
      metadata_table,
      markers_table,
    }
  }

  /// Builds an unsigned event stamped with the current time.
  pub fn build(&self, kind: EventKind, tags: Vec<Tag>, content: String, pubkey: PubKey) -> Event {
    let created_at = get_time_now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs();

    Event::new_without_signature(pubkey, created_at, kind, tags, content)
  }

  /// Signs with the configured signer capability. See
  /// [`IdentityManager::sign`] for the no-identity sentinel.
  pub async fn sign(&self, event: Event) -> Event {
    let identity = self.identity.lock().await;
    identity.sign(event).await
  }

  pub fn verify(&self, event: &Event) -> bool {
    event.verify()
  }

  /// Routes an event into its per-kind local store. Text and direct
  /// messages are keyed by id, metadata by pubkey; other kinds are
  /// logged and dropped.
  pub async fn cache(&self, event: &Event) {
    match event.kind {
      EventKind::Text | EventKind::EncryptedDirectMessage => {
        let record = EventRecord {
          event: event.clone(),
          decrypt_failed: false,
        };
        if let Err(err) = self.events_table.store_event(&record) {
          warn!("Could not cache event {}: {err}", event.id);
        }
      }
      EventKind::Metadata => {
        self.cache_metadata(event).await;
      }
      _ => debug!("Not caching event {} of kind {}", event.id, event.kind),
    }
  }

  pub async fn cache_all(&self, events: &[Event]) {
    for event in events {
      self.cache(event).await;
    }
  }

  /// Stores a metadata event unless one is already cached for its
  /// pubkey, and always (re)derives the DisplayInfo entry from the
  /// event in hand.
  pub async fn cache_metadata(&self, event: &Event) -> DisplayInfo {
    match self.metadata_table.store_metadata_if_absent(event) {
      Ok(false) => debug!("Keeping existing metadata for {}", event.pubkey),
      Ok(true) => {}
      Err(err) => warn!("Could not cache metadata for {}: {err}", event.pubkey),
    }

    let display_info = derive_display_info(event);
    self
      .session
      .cache_display_info(event.pubkey.clone(), display_info.clone())
      .await;

    display_info
  }

  pub fn cached_event(&self, event_id: &str) -> Option<EventRecord> {
    self.events_table.get_event(event_id).unwrap_or_else(|err| {
      warn!("Could not read cached event {event_id}: {err}");
      None
    })
  }

  pub fn cached_metadata(&self, pubkey: &str) -> Option<Event> {
    self.metadata_table.get_metadata(pubkey).unwrap_or_else(|err| {
      warn!("Could not read cached metadata for {pubkey}: {err}");
      None
    })
  }

  /// Marks a direct message whose content could not be decrypted.
  /// The UI shows the failed state and disables further edits.
  pub fn flag_decrypt_failed(&self, event_id: &str) {
    if let Some(mut record) = self.cached_event(event_id) {
      record.decrypt_failed = true;
      if let Err(err) = self.events_table.store_event(&record) {
        warn!("Could not flag event {event_id}: {err}");
      }
    }
  }

  pub fn is_persisted(&self, event_id: &str) -> bool {
    self.markers_table.is_persisted(event_id).unwrap_or_else(|err| {
      warn!("Could not read persisted marker for {event_id}: {err}");
      false
    })
  }

  pub fn mark_persisted(&self, event_id: &str, node_id: &str) {
    if let Err(err) = self.markers_table.mark_persisted(event_id, node_id) {
      warn!("Could not mark event {event_id} as persisted: {err}");
    }
  }
}
