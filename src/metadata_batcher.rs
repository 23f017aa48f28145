use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::bridge::{PersistenceBridge, UiSignal};
use crate::event::kind::EventKind;
use crate::event::{Event, PubKey};
use crate::event_service::EventService;
use crate::filter::Filter;
use crate::query::{QueryEngine, QueryOptions};
use crate::relay_url::RelayUrl;
use crate::session::{DisplayInfo, Session};

#[derive(Default)]
struct BatcherState {
  pending: Vec<PubKey>,
  persist_on_resolve: HashSet<PubKey>,
  render_invalidated: bool,
}

/// Coalesces individual identity-metadata lookups into periodic
/// batched queries.
///
/// Batched lookups go through the caller's own relay set only, not
/// each target user's configured relays. Profiles published nowhere
/// near our relays stay unresolved.
pub struct MetadataBatcher {
  session: Arc<Session>,
  engine: Arc<QueryEngine>,
  event_service: Arc<EventService>,
  bridge: Arc<dyn PersistenceBridge>,
  relays: Mutex<Vec<RelayUrl>>,
  state: Mutex<BatcherState>,
}

impl MetadataBatcher {
  pub fn new(
    session: Arc<Session>,
    engine: Arc<QueryEngine>,
    event_service: Arc<EventService>,
    bridge: Arc<dyn PersistenceBridge>,
    relays: Vec<RelayUrl>,
  ) -> Self {
    Self {
      session,
      engine,
      event_service,
      bridge,
      relays: Mutex::new(relays),
      state: Mutex::new(BatcherState::default()),
    }
  }

  pub async fn set_relays(&self, relays: Vec<RelayUrl>) {
    *self.relays.lock().await = relays;
  }

  /// Requests display data for a pubkey. A local metadata hit
  /// rederives the display entry right away and skips the queue; a
  /// miss joins the next batched lookup. `persist_on_resolve` marks
  /// the pubkey for forwarding to the backend once resolved.
  pub async fn enqueue(&self, pubkey: PubKey, persist_on_resolve: bool) {
    if let Some(metadata_event) = self.event_service.cached_metadata(&pubkey) {
      self.event_service.cache_metadata(&metadata_event).await;
      return;
    }

    let mut state = self.state.lock().await;
    if !state.pending.contains(&pubkey) {
      state.pending.push(pubkey.clone());
    }
    if persist_on_resolve {
      state.persist_on_resolve.insert(pubkey);
    }
    state.render_invalidated = true;
  }

  /// Flags rendered content as stale so the next drain cycle emits a
  /// refresh even with nothing left to look up.
  pub async fn invalidate_render(&self) {
    let mut state = self.state.lock().await;
    state.render_invalidated = true;
  }

  /// One drain cycle. An empty queue only settles the
  /// render-invalidated flag; otherwise the whole queue becomes one
  /// multi-author metadata query, results land in the caches, one
  /// refresh signal fires and the persist subset is forwarded to the
  /// backend off the drain path. The returned handle is that forward.
  pub async fn drain(&self) -> Option<JoinHandle<()>> {
    let (batch, persist_on_resolve) = {
      let mut state = self.state.lock().await;

      if state.pending.is_empty() {
        if state.render_invalidated {
          state.render_invalidated = false;
          self.session.emit_ui_signal(UiSignal::Refresh);
        }
        return None;
      }

      (
        std::mem::take(&mut state.pending),
        std::mem::take(&mut state.persist_on_resolve),
      )
    };

    debug!("Draining {} queued metadata lookups", batch.len());

    let filters = vec![Filter {
      authors: Some(batch),
      kinds: Some(vec![EventKind::Metadata]),
      ..Default::default()
    }];
    let relays = self.relays.lock().await.clone();

    // the query engine routes every result through the cache, which
    // derives a display entry per metadata event
    let events = self
      .engine
      .query_relays(&relays, filters, QueryOptions::Background)
      .await;

    {
      let mut state = self.state.lock().await;
      state.render_invalidated = false;
    }
    self.session.emit_ui_signal(UiSignal::Refresh);

    let to_persist: Vec<Event> = events
      .into_iter()
      .filter(|event| persist_on_resolve.contains(&event.pubkey))
      .collect();
    if to_persist.is_empty() {
      return None;
    }

    let session = Arc::clone(&self.session);
    let event_service = Arc::clone(&self.event_service);
    let bridge = Arc::clone(&self.bridge);
    Some(tokio::spawn(async move {
      let mut derived_user_info: HashMap<PubKey, DisplayInfo> = HashMap::new();
      for event in &to_persist {
        if let Some(info) = session.display_info(&event.pubkey).await {
          derived_user_info.insert(event.pubkey.clone(), info);
        }
      }

      let outcome = bridge.save_events(to_persist.clone(), derived_user_info).await;
      for (event, node_id) in to_persist.iter().zip(outcome.event_node_ids.iter()) {
        event_service.mark_persisted(&event.id, node_id);
      }
    }))
  }

  /// Drives [`MetadataBatcher::drain`] on a fixed interval until the
  /// returned handle is aborted.
  pub fn spawn_drain_loop(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
      loop {
        ticker.tick().await;
        self.drain().await;
      }
    })
  }
}
