use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::bridge::UiSignal;
use crate::event::PubKey;
use crate::relay_url::RelayUrl;

/// Render-ready display data derived from a metadata event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayInfo {
  pub display: String,
  pub title: String,
  pub picture: String,
}

/// Shared state for one client session.
///
/// Four structures are shared across concurrent tasks and each sits
/// behind its own lock: the append-only set of every relay observed,
/// the first-write-wins [`DisplayInfo`] cache, the per-owner relay
/// config cache and the outstanding-operation counter. A single-slot
/// semaphore keeps two full-network scans from overlapping.
pub struct Session {
  known_relays: Mutex<BTreeSet<RelayUrl>>,
  display_info: Mutex<HashMap<PubKey, DisplayInfo>>,
  relay_configs: Mutex<HashMap<String, String>>,
  busy_operations: AtomicUsize,
  ui_signals: UnboundedSender<UiSignal>,
  scan_guard: Semaphore,
}

impl Session {
  pub fn new() -> (Arc<Self>, UnboundedReceiver<UiSignal>) {
    let (ui_signals, ui_receiver) = unbounded_channel();

    let session = Arc::new(Self {
      known_relays: Mutex::new(BTreeSet::new()),
      display_info: Mutex::new(HashMap::new()),
      relay_configs: Mutex::new(HashMap::new()),
      busy_operations: AtomicUsize::new(0),
      ui_signals,
      scan_guard: Semaphore::new(1),
    });

    (session, ui_receiver)
  }

  /// Records relays in the append-only known set.
  pub async fn add_known_relays<I>(&self, relays: I)
  where
    I: IntoIterator<Item = RelayUrl>,
  {
    let mut known_relays = self.known_relays.lock().await;
    known_relays.extend(relays);
  }

  pub async fn known_relays(&self) -> Vec<RelayUrl> {
    let known_relays = self.known_relays.lock().await;
    known_relays.iter().cloned().collect()
  }

  /// Caches display info for a pubkey. The first successful insert
  /// wins; a later entry for the same pubkey never overwrites it.
  /// Returns whether a new entry was inserted.
  pub async fn cache_display_info(&self, pubkey: PubKey, info: DisplayInfo) -> bool {
    let mut display_info = self.display_info.lock().await;
    let mut inserted = false;
    display_info.entry(pubkey).or_insert_with(|| {
      inserted = true;
      info
    });
    inserted
  }

  pub async fn display_info(&self, pubkey: &str) -> Option<DisplayInfo> {
    let display_info = self.display_info.lock().await;
    display_info.get(pubkey).cloned()
  }

  pub async fn display_info_snapshot(&self) -> HashMap<PubKey, DisplayInfo> {
    let display_info = self.display_info.lock().await;
    display_info.clone()
  }

  pub async fn cached_relay_config(&self, owner_id: &str) -> Option<String> {
    let relay_configs = self.relay_configs.lock().await;
    relay_configs.get(owner_id).cloned()
  }

  pub async fn cache_relay_config(&self, owner_id: String, relay_list: String) {
    let mut relay_configs = self.relay_configs.lock().await;
    relay_configs.insert(owner_id, relay_list);
  }

  /// Marks one network operation outstanding. The returned guard
  /// releases on drop, so every exit path decrements. The 0 -> 1
  /// transition emits `UiSignal::Busy(true)`.
  pub fn begin_busy(self: &Arc<Self>) -> BusyGuard {
    if self.busy_operations.fetch_add(1, Ordering::SeqCst) == 0 {
      let _ = self.ui_signals.send(UiSignal::Busy(true));
    }

    BusyGuard {
      session: Arc::clone(self),
    }
  }

  pub fn is_busy(&self) -> bool {
    self.busy_operations.load(Ordering::SeqCst) > 0
  }

  pub(crate) fn outstanding_operations(&self) -> usize {
    self.busy_operations.load(Ordering::SeqCst)
  }

  pub(crate) fn emit_ui_signal(&self, signal: UiSignal) {
    let _ = self.ui_signals.send(signal);
  }

  /// Claims the full-network-scan slot. `None` while another scan
  /// holds it; the permit releases on drop.
  pub fn try_begin_scan(&self) -> Option<SemaphorePermit<'_>> {
    self.scan_guard.try_acquire().ok()
  }

  /// Clears session state at teardown.
  pub async fn teardown(&self) {
    self.known_relays.lock().await.clear();
    self.display_info.lock().await.clear();
    self.relay_configs.lock().await.clear();
  }
}

/// Scope guard pairing with [`Session::begin_busy`].
pub struct BusyGuard {
  session: Arc<Session>,
}

impl Drop for BusyGuard {
  fn drop(&mut self) {
    // clamped at zero, a stray release must never underflow
    let previous = self
      .session
      .busy_operations
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
        Some(count.saturating_sub(1))
      });

    if previous == Ok(1) {
      let _ = self.session.ui_signals.send(UiSignal::Busy(false));
    }
  }
}
