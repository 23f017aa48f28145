use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use log::{debug, warn};

use crate::event::Event;
use crate::event_service::EventService;
use crate::filter::Filter;
use crate::relay_url::{parse_relay_list, RelayUrl};
use crate::session::Session;
use crate::transport::RelayFetcher;

/// How a query participates in the busy accounting. Background and
/// silent queries skip the outstanding-operation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOptions {
  #[default]
  Foreground,
  Background,
  Silent,
}

impl QueryOptions {
  fn counts_as_busy(&self) -> bool {
    matches!(self, QueryOptions::Foreground)
  }
}

/// Per-relay accept/reject reports for one published event. The
/// outcome is complete: every relay has reported (or timed out to a
/// reject) before it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishOutcome {
  pub accepted: Vec<RelayUrl>,
  pub rejected: Vec<RelayUrl>,
}

impl PublishOutcome {
  pub fn is_fully_accepted(&self) -> bool {
    self.rejected.is_empty() && !self.accepted.is_empty()
  }
}

/// Sorts newest-first. Multi-relay results are unordered after the
/// merge, callers needing chronology sort explicitly.
pub fn sort_newest_first(events: &mut [Event]) {
  events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Executes filtered queries against one or many relays concurrently.
pub struct QueryEngine {
  session: Arc<Session>,
  event_service: Arc<EventService>,
  fetcher: Arc<dyn RelayFetcher>,
}

impl QueryEngine {
  pub fn new(
    session: Arc<Session>,
    event_service: Arc<EventService>,
    fetcher: Arc<dyn RelayFetcher>,
  ) -> Self {
    Self {
      session,
      event_service,
      fetcher,
    }
  }

  /// Queries the relays named in a newline-delimited configuration
  /// string. An empty configuration short-circuits: no relays, no
  /// query, no busy change.
  pub async fn query_config(
    &self,
    relay_config: &str,
    filters: Vec<Filter>,
    options: QueryOptions,
  ) -> Vec<Event> {
    let relays = parse_relay_list(relay_config);
    self.query_relays(&relays, filters, options).await
  }

  /// Queries a set of relays with one filter list. Results are merged
  /// unordered, deduped by event id, stripped of events that fail
  /// verification and routed through the local cache before return.
  pub async fn query_relays(
    &self,
    relays: &[RelayUrl],
    filters: Vec<Filter>,
    options: QueryOptions,
  ) -> Vec<Event> {
    if relays.is_empty() {
      warn!("No relays to query, returning nothing");
      return vec![];
    }

    let _busy = options.counts_as_busy().then(|| self.session.begin_busy());
    self.session.add_known_relays(relays.iter().cloned()).await;

    let mut events = if let [relay_url] = relays {
      // single relay, no fan-out overhead
      self.fetcher.fetch_events(relay_url, filters).await
    } else {
      let queries = relays
        .iter()
        .map(|relay_url| self.fetcher.fetch_events(relay_url, filters.clone()));

      join_all(queries).await.into_iter().flatten().collect()
    };

    let mut seen: HashSet<String> = HashSet::new();
    events.retain(|event| {
      if !event.verify() {
        debug!("Skipping event {} that failed verification", event.id);
        return false;
      }
      seen.insert(event.id.clone())
    });

    self.event_service.cache_all(&events).await;

    events
  }

  /// Publishes one event to every relay in the set and gathers the
  /// per-relay reports before returning.
  pub async fn publish(
    &self,
    relays: &[RelayUrl],
    event: Event,
    options: QueryOptions,
  ) -> PublishOutcome {
    if relays.is_empty() {
      warn!("No relays to publish to");
      return PublishOutcome::default();
    }

    let _busy = options.counts_as_busy().then(|| self.session.begin_busy());
    self.session.add_known_relays(relays.iter().cloned()).await;

    let publishes = relays.iter().map(|relay_url| {
      let event = event.clone();
      async move { (relay_url.clone(), self.fetcher.publish(relay_url, event).await) }
    });

    let mut outcome = PublishOutcome::default();
    for (relay_url, accepted) in join_all(publishes).await {
      if accepted {
        outcome.accepted.push(relay_url);
      } else {
        outcome.rejected.push(relay_url);
      }
    }

    outcome
  }
}

#[cfg(test)]
mod tests {
  use crate::bridge::UiSignal;
  use crate::event::kind::EventKind;
  use crate::test_support::{signed_event, MockFetcher, TestHarness};

  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  #[tokio::test]
  async fn test_zero_relays_short_circuits() {
    let mut harness = TestHarness::new("query_zero_relays", MockFetcher::default());

    let events = harness
      .engine
      .query_config("", vec![Filter::default()], QueryOptions::Foreground)
      .await;

    assert!(events.is_empty());
    assert_eq!(0, harness.fetcher.fetch_count());
    assert!(!harness.session.is_busy());
    assert!(harness.ui_receiver.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_busy_counter_rises_and_settles_to_zero() {
    let fetcher = MockFetcher::default();
    let relay = RelayUrl::parse("relay.example.com").unwrap();
    let mut harness = TestHarness::new("query_busy", fetcher);

    harness
      .engine
      .query_relays(&[relay.clone()], vec![Filter::default()], QueryOptions::Foreground)
      .await;
    harness
      .engine
      .query_relays(&[relay], vec![Filter::default()], QueryOptions::Foreground)
      .await;

    assert_eq!(0, harness.session.outstanding_operations());
    assert_eq!(Some(UiSignal::Busy(true)), harness.ui_receiver.try_recv().ok());
    assert_eq!(Some(UiSignal::Busy(false)), harness.ui_receiver.try_recv().ok());
    assert_eq!(Some(UiSignal::Busy(true)), harness.ui_receiver.try_recv().ok());
    assert_eq!(Some(UiSignal::Busy(false)), harness.ui_receiver.try_recv().ok());
  }

  #[tokio::test]
  async fn test_background_and_silent_queries_skip_busy_accounting() {
    let relay = RelayUrl::parse("relay.example.com").unwrap();
    let mut harness = TestHarness::new("query_background", MockFetcher::default());

    harness
      .engine
      .query_relays(&[relay.clone()], vec![Filter::default()], QueryOptions::Background)
      .await;
    harness
      .engine
      .query_relays(&[relay], vec![Filter::default()], QueryOptions::Silent)
      .await;

    assert!(harness.ui_receiver.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_multi_relay_results_are_merged_and_deduped() {
    let relay_a = RelayUrl::parse("a.example.com").unwrap();
    let relay_b = RelayUrl::parse("b.example.com").unwrap();

    let shared = signed_event(EventKind::Text, "seen on both relays");
    let only_b = signed_event(EventKind::Text, "seen on one relay");

    let fetcher = MockFetcher::default();
    fetcher.serve(&relay_a, vec![shared.clone()]);
    fetcher.serve(&relay_b, vec![shared.clone(), only_b.clone()]);

    let harness = TestHarness::new("query_merge", fetcher);

    let mut events = harness
      .engine
      .query_relays(
        &[relay_a, relay_b],
        vec![Filter::default()],
        QueryOptions::Foreground,
      )
      .await;

    events.sort_by(|a, b| a.content.cmp(&b.content));
    assert_eq!(vec![shared, only_b], events);
  }

  #[tokio::test]
  async fn test_unverifiable_events_are_dropped_and_results_cached() {
    let relay = RelayUrl::parse("relay.example.com").unwrap();

    let valid = signed_event(EventKind::Text, "valid");
    let mut forged = signed_event(EventKind::Text, "forged");
    forged.content = "tampered after signing".to_string();

    let fetcher = MockFetcher::default();
    fetcher.serve(&relay, vec![valid.clone(), forged.clone()]);

    let harness = TestHarness::new("query_verification", fetcher);

    let events = harness
      .engine
      .query_relays(&[relay], vec![Filter::default()], QueryOptions::Foreground)
      .await;

    assert_eq!(vec![valid.clone()], events);
    assert!(harness.event_service.cached_event(&valid.id).is_some());
    assert!(harness.event_service.cached_event(&forged.id).is_none());
  }

  #[tokio::test]
  async fn test_publish_gathers_every_report() {
    let relay_a = RelayUrl::parse("a.example.com").unwrap();
    let relay_b = RelayUrl::parse("b.example.com").unwrap();
    let relay_c = RelayUrl::parse("c.example.com").unwrap();

    let fetcher = MockFetcher::default();
    fetcher.reject_from(&relay_b);

    let harness = TestHarness::new("query_publish", fetcher);

    let event = signed_event(EventKind::Text, "fan-out");
    let outcome = harness
      .engine
      .publish(
        &[relay_a.clone(), relay_b.clone(), relay_c.clone()],
        event,
        QueryOptions::Foreground,
      )
      .await;

    assert_eq!(vec![relay_a, relay_c], outcome.accepted);
    assert_eq!(vec![relay_b], outcome.rejected);
    assert!(!outcome.is_fully_accepted());
    assert_eq!(0, harness.session.outstanding_operations());
  }

  #[test]
  fn test_sort_newest_first() {
    let mut events = vec![
      Event {
        id: "old".to_string(),
        created_at: 10,
        ..Default::default()
      },
      Event {
        id: "new".to_string(),
        created_at: 30,
        ..Default::default()
      },
      Event {
        id: "middle".to_string(),
        created_at: 20,
        ..Default::default()
      },
    ];

    sort_newest_first(&mut events);

    let ids: Vec<&str> = events.iter().map(|event| event.id.as_str()).collect();
    assert_eq!(vec!["new", "middle", "old"], ids);
  }
}
