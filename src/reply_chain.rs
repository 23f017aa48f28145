use std::sync::Arc;

use log::debug;

use crate::event::id::EventId;
use crate::event::marker::Marker;
use crate::event::tag::Tag;
use crate::event::Event;
use crate::filter::Filter;
use crate::query::{QueryEngine, QueryOptions};
use crate::relay_url::RelayUrl;

/// The event one reply points back to, with the relay it was said to
/// live on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyReference {
  pub event_id: String,
  pub relay_hint: Option<RelayUrl>,
}

/// Picks the reference a reply event points back to. Precedence: a
/// tag marked "reply", then one marked "root", then the last
/// unmarked event tag of the legacy positional scheme. `None` means
/// the event starts its own thread.
pub fn extract_reply_reference(tags: &[Tag]) -> Option<ReplyReference> {
  let mut marked_reply: Option<ReplyReference> = None;
  let mut marked_root: Option<ReplyReference> = None;
  let mut legacy_positional: Option<ReplyReference> = None;

  for tag in tags {
    let Tag::Event(event_id, recommended_relay, marker) = tag else {
      continue;
    };

    let reference = ReplyReference {
      event_id: event_id.0.clone(),
      relay_hint: recommended_relay
        .as_ref()
        .and_then(|relay| RelayUrl::parse(&relay.0).ok()),
    };

    match marker {
      Some(Marker::Reply) => {
        if marked_reply.is_none() {
          marked_reply = Some(reference);
        }
      }
      Some(Marker::Root) => {
        if marked_root.is_none() {
          marked_root = Some(reference);
        }
      }
      Some(Marker::Mention) => {}
      Some(Marker::Default) | None => legacy_positional = Some(reference),
    }
  }

  marked_reply.or(marked_root).or(legacy_positional)
}

/// Walks a reply event backward through its ancestor chain.
pub struct ReplyChainResolver {
  engine: Arc<QueryEngine>,
  fallback_relays: Vec<RelayUrl>,
}

impl ReplyChainResolver {
  pub fn new(engine: Arc<QueryEngine>, fallback_relays: Vec<RelayUrl>) -> Self {
    Self {
      engine,
      fallback_relays,
    }
  }

  /// Resolves the ancestors of `leaf`, oldest first with the leaf
  /// last. At most `hop_budget` ancestors are fetched; the budget is
  /// spent on successful hops only. A miss across every lookup
  /// strategy ends the walk, whatever was found so far is a valid
  /// partial chain.
  pub async fn resolve(&self, leaf: Event, hop_budget: u32) -> Vec<Event> {
    let mut chain = vec![leaf];
    let mut accumulated_relays: Vec<RelayUrl> = vec![];
    let mut budget = hop_budget;
    let mut current_tags = chain[0].tags.clone();

    while budget > 0 {
      let Some(reference) = extract_reply_reference(&current_tags) else {
        break;
      };

      let Some(ancestor) = self.lookup(&reference, &accumulated_relays).await else {
        debug!(
          "Could not resolve ancestor {}, keeping partial chain",
          reference.event_id
        );
        break;
      };

      if let Some(relay_hint) = reference.relay_hint {
        if !accumulated_relays.contains(&relay_hint) {
          accumulated_relays.push(relay_hint);
        }
      }

      current_tags = ancestor.tags.clone();
      chain.insert(0, ancestor);
      budget -= 1;
    }

    chain
  }

  /// Escalating lookup for one referenced event: the reference's own
  /// relay hint first, then every relay seen so far in the walk, then
  /// the fallback list. Each strategy runs only when the previous one
  /// found nothing.
  async fn lookup(
    &self,
    reference: &ReplyReference,
    accumulated_relays: &[RelayUrl],
  ) -> Option<Event> {
    if let Some(relay_hint) = &reference.relay_hint {
      let hinted = [relay_hint.clone()];
      if let Some(event) = self.query_for(reference, &hinted).await {
        return Some(event);
      }
    }

    if let Some(event) = self.query_for(reference, accumulated_relays).await {
      return Some(event);
    }

    self.query_for(reference, &self.fallback_relays).await
  }

  async fn query_for(&self, reference: &ReplyReference, relays: &[RelayUrl]) -> Option<Event> {
    if relays.is_empty() {
      return None;
    }

    let filters = vec![Filter {
      ids: Some(vec![EventId(reference.event_id.clone())]),
      ..Default::default()
    }];

    self
      .engine
      .query_relays(relays, filters, QueryOptions::Background)
      .await
      .into_iter()
      .find(|event| event.id == reference.event_id)
  }
}

#[cfg(test)]
mod tests {
  use crate::event::kind::EventKind;
  use crate::event::tag::UncheckedRecommendRelayURL;
  use crate::test_support::{signed_event, signed_event_with_tags, MockFetcher, TestHarness};

  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  fn reply_tag(ancestor: &Event, relay_hint: Option<&str>, marker: Option<Marker>) -> Tag {
    Tag::Event(
      EventId(ancestor.id.clone()),
      relay_hint.map(|hint| UncheckedRecommendRelayURL(hint.to_string())),
      marker,
    )
  }

  fn resolver(harness: &TestHarness, fallback: &[RelayUrl]) -> ReplyChainResolver {
    ReplyChainResolver::new(Arc::clone(&harness.engine), fallback.to_vec())
  }

  #[test]
  fn test_extract_reply_reference_precedence() {
    let root = signed_event(EventKind::Text, "root");
    let reply = signed_event(EventKind::Text, "reply");
    let legacy_a = signed_event(EventKind::Text, "legacy a");
    let legacy_b = signed_event(EventKind::Text, "legacy b");

    let tags = vec![
      reply_tag(&legacy_a, None, None),
      reply_tag(&root, None, Some(Marker::Root)),
      reply_tag(&reply, None, Some(Marker::Reply)),
      reply_tag(&legacy_b, None, None),
    ];

    let reference = extract_reply_reference(&tags).unwrap();
    assert_eq!(reply.id, reference.event_id);

    let tags = vec![
      reply_tag(&root, None, Some(Marker::Root)),
      reply_tag(&legacy_b, None, None),
    ];
    let reference = extract_reply_reference(&tags).unwrap();
    assert_eq!(root.id, reference.event_id);

    // last unmarked tag wins under the legacy positional scheme
    let tags = vec![
      reply_tag(&legacy_a, None, None),
      reply_tag(&legacy_b, None, None),
    ];
    let reference = extract_reply_reference(&tags).unwrap();
    assert_eq!(legacy_b.id, reference.event_id);

    assert!(extract_reply_reference(&[]).is_none());
  }

  #[tokio::test]
  async fn test_leaf_without_reply_tags_is_its_own_chain() {
    let harness = TestHarness::new("reply_chain_leaf", MockFetcher::default());
    let fallback = [RelayUrl::parse("fallback.example.com").unwrap()];

    let leaf = signed_event(EventKind::Text, "standalone note");
    let chain = resolver(&harness, &fallback).resolve(leaf.clone(), 10).await;

    assert_eq!(vec![leaf], chain);
    assert_eq!(0, harness.fetcher.fetch_count());
  }

  #[tokio::test]
  async fn test_chain_is_resolved_oldest_first() {
    let fallback = RelayUrl::parse("fallback.example.com").unwrap();

    let root = signed_event(EventKind::Text, "root");
    let middle = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&root, None, Some(Marker::Root))],
      "middle",
    );
    let leaf = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&middle, None, Some(Marker::Reply))],
      "leaf",
    );

    let fetcher = MockFetcher::default();
    fetcher.serve(&fallback, vec![root.clone(), middle.clone()]);
    let harness = TestHarness::new("reply_chain_walk", fetcher);

    let chain = resolver(&harness, &[fallback]).resolve(leaf.clone(), 10).await;

    assert_eq!(vec![root, middle, leaf], chain);
  }

  #[tokio::test]
  async fn test_hop_budget_caps_successful_expansions() {
    let fallback = RelayUrl::parse("fallback.example.com").unwrap();

    let root = signed_event(EventKind::Text, "root");
    let middle = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&root, None, Some(Marker::Root))],
      "middle",
    );
    let leaf = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&middle, None, Some(Marker::Reply))],
      "leaf",
    );

    let fetcher = MockFetcher::default();
    fetcher.serve(&fallback, vec![root.clone(), middle.clone()]);
    let harness = TestHarness::new("reply_chain_budget", fetcher);

    let chain = resolver(&harness, &[fallback]).resolve(leaf.clone(), 1).await;
    assert_eq!(vec![middle.clone(), leaf.clone()], chain);

    let chain = resolver(&harness, &[]).resolve(leaf.clone(), 0).await;
    assert_eq!(vec![leaf], chain);
  }

  #[tokio::test]
  async fn test_missing_ancestor_yields_partial_chain() {
    let fallback = RelayUrl::parse("fallback.example.com").unwrap();

    let root = signed_event(EventKind::Text, "root never published");
    let middle = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&root, None, Some(Marker::Root))],
      "middle",
    );
    let leaf = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&middle, None, Some(Marker::Reply))],
      "leaf",
    );

    let fetcher = MockFetcher::default();
    fetcher.serve(&fallback, vec![middle.clone()]);
    let harness = TestHarness::new("reply_chain_partial", fetcher);

    let chain = resolver(&harness, &[fallback]).resolve(leaf.clone(), 10).await;

    assert_eq!(vec![middle, leaf], chain);
  }

  #[tokio::test]
  async fn test_relay_hint_is_tried_and_accumulated() {
    let hinted = RelayUrl::parse("hinted.example.com").unwrap();
    let fallback = RelayUrl::parse("fallback.example.com").unwrap();

    let root = signed_event(EventKind::Text, "root");
    let middle = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&root, None, Some(Marker::Root))],
      "middle",
    );
    let leaf = signed_event_with_tags(
      EventKind::Text,
      vec![reply_tag(&middle, Some("hinted.example.com"), Some(Marker::Reply))],
      "leaf",
    );

    // both ancestors live only on the hinted relay; the root is
    // reachable through the accumulated set grown at the first hop
    let fetcher = MockFetcher::default();
    fetcher.serve(&hinted, vec![root.clone(), middle.clone()]);
    let harness = TestHarness::new("reply_chain_hint", fetcher);

    let chain = resolver(&harness, &[fallback]).resolve(leaf.clone(), 10).await;

    assert_eq!(vec![root, middle, leaf], chain);
  }
}
