use std::time::Duration;

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::bridge::{PersistenceBridge, UiSignal};
use crate::database::events_table::EventsTable;
use crate::database::keys_table::KeysTable;
use crate::database::markers_table::MarkersTable;
use crate::database::metadata_table::MetadataTable;
use crate::event::id::EventId;
use crate::event::kind::EventKind;
use crate::event::marker::Marker;
use crate::event::tag::{Tag, UncheckedRecommendRelayURL};
use crate::event::{Event, PubKey};
use crate::event_service::EventService;
use crate::filter::Filter;
use crate::identity::{Identity, IdentityManager, SignerConfig};
use crate::metadata_batcher::MetadataBatcher;
use crate::query::{PublishOutcome, QueryEngine, QueryOptions};
use crate::references::{ContentSegment, ReferenceResolver};
use crate::relay_url::{parse_relay_list, RelayUrl};
use crate::reply_chain::ReplyChainResolver;
use crate::session::Session;
use crate::transport::RelayFetcher;

/// High-level entry point wiring the session, identity, event
/// handling, querying, thread resolution and metadata batching over
/// one [`RelayFetcher`] and one [`PersistenceBridge`].
pub struct Client {
  session: Arc<Session>,
  identity: Arc<Mutex<IdentityManager>>,
  event_service: Arc<EventService>,
  engine: Arc<QueryEngine>,
  resolver: ReplyChainResolver,
  batcher: Arc<MetadataBatcher>,
  references: ReferenceResolver,
  bridge: Arc<dyn PersistenceBridge>,
}

impl Client {
  pub fn new(
    fetcher: Arc<dyn RelayFetcher>,
    bridge: Arc<dyn PersistenceBridge>,
    fallback_relays: Vec<RelayUrl>,
  ) -> (Self, UnboundedReceiver<UiSignal>) {
    Self::new_with_tables(
      fetcher,
      bridge,
      fallback_relays,
      KeysTable::default(),
      EventsTable::default(),
      MetadataTable::default(),
      MarkersTable::default(),
    )
  }

  pub fn new_with_tables(
    fetcher: Arc<dyn RelayFetcher>,
    bridge: Arc<dyn PersistenceBridge>,
    fallback_relays: Vec<RelayUrl>,
    keys_table: KeysTable,
    events_table: EventsTable,
    metadata_table: MetadataTable,
    markers_table: MarkersTable,
  ) -> (Self, UnboundedReceiver<UiSignal>) {
    let (session, ui_receiver) = Session::new();
    let identity = Arc::new(Mutex::new(IdentityManager::new(
      SignerConfig::LocalKey,
      keys_table,
    )));

    let event_service = Arc::new(EventService::new(
      Arc::clone(&session),
      Arc::clone(&identity),
      events_table,
      metadata_table,
      markers_table,
    ));
    let engine = Arc::new(QueryEngine::new(
      Arc::clone(&session),
      Arc::clone(&event_service),
      fetcher,
    ));
    let resolver = ReplyChainResolver::new(Arc::clone(&engine), fallback_relays.clone());
    let batcher = Arc::new(MetadataBatcher::new(
      Arc::clone(&session),
      Arc::clone(&engine),
      Arc::clone(&event_service),
      Arc::clone(&bridge),
      fallback_relays,
    ));
    let references = ReferenceResolver::new(Arc::clone(&session), Arc::clone(&batcher));

    let client = Self {
      session,
      identity,
      event_service,
      engine,
      resolver,
      batcher,
      references,
      bridge,
    };

    (client, ui_receiver)
  }

  /// Creates a fresh identity and announces its public key to the
  /// backend.
  pub async fn generate_identity(&self) -> Identity {
    let generated = {
      let mut identity = self.identity.lock().await;
      identity.generate()
    };

    let acked = self
      .bridge
      .save_public_identity(
        generated.encoded_public_key.clone(),
        generated.public_key.to_string(),
      )
      .await;
    if !acked {
      warn!("Backend did not ack the new public identity");
    }

    generated
  }

  /// Rehydrates the identity persisted locally, if any.
  pub async fn load_identity(&self) -> Option<Identity> {
    let mut identity = self.identity.lock().await;
    identity.load_from_store()
  }

  pub async fn logout(&self) {
    {
      let mut identity = self.identity.lock().await;
      identity.invalidate();
    }
    self.session.teardown().await;
  }

  async fn encoded_public_key(&self) -> Option<PubKey> {
    let identity = self.identity.lock().await;
    identity
      .identity()
      .map(|identity| identity.encoded_public_key.clone())
  }

  /// The relay set for this session: the owner's configured list,
  /// fetched from the backend once and cached, or every relay seen so
  /// far when no list is configured.
  pub async fn own_relays(&self) -> Vec<RelayUrl> {
    let relay_config = match self.encoded_public_key().await {
      Some(owner_id) => match self.session.cached_relay_config(&owner_id).await {
        Some(cached) => cached,
        None => {
          let fetched = self.bridge.get_user_relay_config(owner_id.clone()).await;
          self
            .session
            .cache_relay_config(owner_id, fetched.clone())
            .await;
          fetched
        }
      },
      None => String::new(),
    };

    let relays = parse_relay_list(&relay_config);
    if relays.is_empty() {
      debug!("No configured relays, falling back to the known set");
      return self.session.known_relays().await;
    }
    relays
  }

  /// Stores a new relay configuration and applies it to the batcher.
  pub async fn save_relay_config(&self, relay_list: &str) -> bool {
    let acked = self.bridge.save_relay_config(relay_list.to_string()).await;
    if let Some(owner_id) = self.encoded_public_key().await {
      self
        .session
        .cache_relay_config(owner_id, relay_list.to_string())
        .await;
    }
    self.batcher.set_relays(parse_relay_list(relay_list)).await;
    acked
  }

  /// Signs and publishes a text note to the session relays. `None`
  /// without a loaded identity. The signed event and the per-relay
  /// reports are returned once every relay has reported.
  pub async fn publish_text_note(&self, content: String) -> Option<(Event, PublishOutcome)> {
    self.publish_event(EventKind::Text, vec![], content).await
  }

  /// Publishes a reply. The parent's root (or the parent itself when
  /// it starts the thread) is tagged as root, the parent as reply,
  /// and the parent's author is tagged so they see the reply.
  pub async fn publish_reply(
    &self,
    parent: &Event,
    content: String,
    relay_hint: Option<RelayUrl>,
  ) -> Option<(Event, PublishOutcome)> {
    let hint =
      relay_hint.map(|relay_url| UncheckedRecommendRelayURL(relay_url.as_str().to_string()));

    let mut tags: Vec<Tag> = vec![];
    match find_root_reference(&parent.tags) {
      Some(root_id) => {
        tags.push(Tag::Event(root_id, None, Some(Marker::Root)));
        tags.push(Tag::Event(
          EventId(parent.id.clone()),
          hint,
          Some(Marker::Reply),
        ));
      }
      None => {
        tags.push(Tag::Event(EventId(parent.id.clone()), hint, Some(Marker::Root)));
      }
    }
    tags.push(Tag::PubKey(vec![parent.pubkey.clone()], None));

    self.publish_event(EventKind::Text, tags, content).await
  }

  async fn publish_event(
    &self,
    kind: EventKind,
    tags: Vec<Tag>,
    content: String,
  ) -> Option<(Event, PublishOutcome)> {
    let Some(pubkey) = self.encoded_public_key().await else {
      warn!("Cannot publish without a loaded identity");
      return None;
    };

    let event = self.event_service.build(kind, tags, content, pubkey);
    let event = self.event_service.sign(event).await;
    if !event.verify() {
      warn!("Built event did not verify, not publishing");
      return None;
    }

    let relays = self.own_relays().await;
    let outcome = self
      .engine
      .publish(&relays, event.clone(), QueryOptions::Foreground)
      .await;

    self.event_service.cache(&event).await;
    self.persist_event(&event).await;

    Some((event, outcome))
  }

  /// Forwards one validated event to the backend and marks it so it
  /// is not persisted again.
  async fn persist_event(&self, event: &Event) {
    if self.event_service.is_persisted(&event.id) {
      return;
    }

    let derived_user_info = self.session.display_info_snapshot().await;
    let outcome = self
      .bridge
      .save_events(vec![event.clone()], derived_user_info)
      .await;
    if let Some(node_id) = outcome.event_node_ids.first() {
      self.event_service.mark_persisted(&event.id, node_id);
    }
  }

  /// Runs a filtered query against the session relays.
  pub async fn query(&self, filters: Vec<Filter>, options: QueryOptions) -> Vec<Event> {
    let relays = self.own_relays().await;
    self.engine.query_relays(&relays, filters, options).await
  }

  /// Runs a filtered query against every relay seen this session.
  /// Only one scan runs at a time; a scan requested while another is
  /// in flight returns nothing.
  pub async fn scan_network(&self, filters: Vec<Filter>) -> Vec<Event> {
    let Some(_permit) = self.session.try_begin_scan() else {
      warn!("A network scan is already running");
      return vec![];
    };

    let relays = self.session.known_relays().await;
    self
      .engine
      .query_relays(&relays, filters, QueryOptions::Foreground)
      .await
  }

  /// Resolves the ancestor chain of a reply, oldest first.
  pub async fn resolve_thread(&self, leaf: Event, hop_budget: u32) -> Vec<Event> {
    self.resolver.resolve(leaf, hop_budget).await
  }

  /// Queues a profile lookup for the next batch cycle.
  pub async fn lookup_profile(&self, pubkey: PubKey, persist_on_resolve: bool) {
    self.batcher.enqueue(pubkey, persist_on_resolve).await;
  }

  /// Splits event content into render segments, substituting tag
  /// references. Never blocks on network I/O.
  pub async fn rendered_content(&self, event: &Event) -> Vec<ContentSegment> {
    self
      .references
      .resolve_references(&event.content, &event.tags)
      .await
  }

  /// Starts the periodic batch-drain timer.
  pub fn start_metadata_batcher(&self, interval: Duration) -> JoinHandle<()> {
    Arc::clone(&self.batcher).spawn_drain_loop(interval)
  }
}

/// The thread root a reply event belongs to, when it is marked.
fn find_root_reference(tags: &[Tag]) -> Option<EventId> {
  tags.iter().find_map(|tag| match tag {
    Tag::Event(event_id, _, Some(Marker::Root)) => Some(event_id.clone()),
    _ => None,
  })
}
