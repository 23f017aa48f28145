use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bitcoin_hashes::hex::ToHex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;

use crate::bridge::{PersistenceBridge, SaveOutcome, UiSignal};
use crate::database::events_table::EventsTable;
use crate::database::keys_table::KeysTable;
use crate::database::markers_table::MarkersTable;
use crate::database::metadata_table::MetadataTable;
use crate::event::kind::EventKind;
use crate::event::tag::Tag;
use crate::event::{Event, PubKey};
use crate::event_service::EventService;
use crate::filter::{check_event_match_filter, Filter};
use crate::identity::{IdentityManager, SignerConfig};
use crate::query::QueryEngine;
use crate::relay_url::RelayUrl;
use crate::schnorr::{self, AsymmetricKeys};
use crate::session::{DisplayInfo, Session};
use crate::transport::RelayFetcher;

pub(crate) fn signed_event(kind: EventKind, content: &str) -> Event {
  signed_event_from(&schnorr::generate_keys(), kind, vec![], content)
}

pub(crate) fn signed_event_with_tags(kind: EventKind, tags: Vec<Tag>, content: &str) -> Event {
  signed_event_from(&schnorr::generate_keys(), kind, tags, content)
}

pub(crate) fn signed_event_from(
  keys: &AsymmetricKeys,
  kind: EventKind,
  tags: Vec<Tag>,
  content: &str,
) -> Event {
  let pubkey = keys.public_key.to_hex()[2..].to_string();
  let mut event = Event::new_without_signature(pubkey, 20, kind, tags, content.to_string());
  event.sign_event(&keys.private_key.secret_bytes());
  event
}

/// In-memory relay: serves pre-loaded events filtered the same way a
/// relay would, records every fetch, and rejects publishes on demand.
#[derive(Default)]
pub(crate) struct MockFetcher {
  served: StdMutex<HashMap<RelayUrl, Vec<Event>>>,
  rejecting: StdMutex<HashSet<RelayUrl>>,
  fetch_calls: AtomicUsize,
  fetch_log: StdMutex<Vec<(RelayUrl, Vec<Filter>)>>,
}

impl MockFetcher {
  pub(crate) fn serve(&self, relay_url: &RelayUrl, events: Vec<Event>) {
    let mut served = self.served.lock().unwrap();
    served.entry(relay_url.clone()).or_default().extend(events);
  }

  pub(crate) fn reject_from(&self, relay_url: &RelayUrl) {
    self.rejecting.lock().unwrap().insert(relay_url.clone());
  }

  pub(crate) fn fetch_count(&self) -> usize {
    self.fetch_calls.load(Ordering::SeqCst)
  }

  pub(crate) fn fetch_log(&self) -> Vec<(RelayUrl, Vec<Filter>)> {
    self.fetch_log.lock().unwrap().clone()
  }
}

#[async_trait]
impl RelayFetcher for MockFetcher {
  async fn fetch_events(&self, relay_url: &RelayUrl, filters: Vec<Filter>) -> Vec<Event> {
    self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    self
      .fetch_log
      .lock()
      .unwrap()
      .push((relay_url.clone(), filters.clone()));

    let served = self.served.lock().unwrap();
    served
      .get(relay_url)
      .map(|events| {
        events
          .iter()
          .filter(|event| {
            filters
              .iter()
              .any(|filter| check_event_match_filter(event, filter))
          })
          .cloned()
          .collect()
      })
      .unwrap_or_default()
  }

  async fn publish(&self, relay_url: &RelayUrl, _event: Event) -> bool {
    !self.rejecting.lock().unwrap().contains(relay_url)
  }
}

/// Records every bridge call and acks them all.
#[derive(Default)]
pub(crate) struct RecordingBridge {
  pub(crate) saved_events: StdMutex<Vec<Event>>,
  pub(crate) saved_user_info: StdMutex<Vec<HashMap<PubKey, DisplayInfo>>>,
  pub(crate) saved_identities: StdMutex<Vec<(String, String)>>,
  pub(crate) relay_config: StdMutex<String>,
  pub(crate) saved_relay_configs: StdMutex<Vec<String>>,
}

impl RecordingBridge {
  pub(crate) fn with_relay_config(relay_config: &str) -> Self {
    let bridge = Self::default();
    *bridge.relay_config.lock().unwrap() = relay_config.to_string();
    bridge
  }
}

#[async_trait]
impl PersistenceBridge for RecordingBridge {
  async fn save_events(
    &self,
    events: Vec<Event>,
    derived_user_info: HashMap<PubKey, DisplayInfo>,
  ) -> SaveOutcome {
    let event_node_ids: Vec<String> = events
      .iter()
      .map(|event| format!("node_{}", event.id))
      .collect();
    let saved_count = events.len() as u64;

    self.saved_events.lock().unwrap().extend(events);
    self.saved_user_info.lock().unwrap().push(derived_user_info);

    SaveOutcome {
      saved_count,
      event_node_ids,
    }
  }

  async fn save_public_identity(
    &self,
    encoded_public_key: String,
    raw_public_key: String,
  ) -> bool {
    self
      .saved_identities
      .lock()
      .unwrap()
      .push((encoded_public_key, raw_public_key));
    true
  }

  async fn get_user_relay_config(&self, _owner_id: String) -> String {
    self.relay_config.lock().unwrap().clone()
  }

  async fn save_relay_config(&self, relay_list: String) -> bool {
    self.saved_relay_configs.lock().unwrap().push(relay_list);
    true
  }
}

/// A full engine wired over temp db files and a [`MockFetcher`].
pub(crate) struct TestHarness {
  pub(crate) session: Arc<Session>,
  pub(crate) ui_receiver: UnboundedReceiver<UiSignal>,
  pub(crate) identity: Arc<Mutex<IdentityManager>>,
  pub(crate) event_service: Arc<EventService>,
  pub(crate) engine: Arc<QueryEngine>,
  pub(crate) fetcher: Arc<MockFetcher>,
  prefix: String,
}

impl Drop for TestHarness {
  fn drop(&mut self) {
    for table in ["keys", "events", "metadata", "markers"] {
      let _ = fs::remove_file(format!("db/{}_{table}.redb", self.prefix));
    }
  }
}

impl TestHarness {
  pub(crate) fn new(prefix: &str, fetcher: MockFetcher) -> Self {
    let (session, ui_receiver) = Session::new();
    let identity = Arc::new(Mutex::new(IdentityManager::new(
      SignerConfig::LocalKey,
      KeysTable::new(Some(format!("{prefix}_keys"))),
    )));

    let event_service = Arc::new(EventService::new(
      Arc::clone(&session),
      Arc::clone(&identity),
      EventsTable::new(Some(format!("{prefix}_events"))),
      MetadataTable::new(Some(format!("{prefix}_metadata"))),
      MarkersTable::new(Some(format!("{prefix}_markers"))),
    ));

    let fetcher = Arc::new(fetcher);
    let engine = Arc::new(QueryEngine::new(
      Arc::clone(&session),
      Arc::clone(&event_service),
      Arc::clone(&fetcher) as Arc<dyn RelayFetcher>,
    ));

    Self {
      session,
      ui_receiver,
      identity,
      event_service,
      engine,
      fetcher,
      prefix: prefix.to_string(),
    }
  }
}
