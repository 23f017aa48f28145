use serde::{Deserialize, Serialize};

use crate::event::{id::EventId, kind::EventKind, tag::Tag, tag::TagKind, Event, PubKey, Timestamp};

///
/// Filters are data structures that clients send to relays
/// to request data from other clients.
/// The attributes of a Filter work as `&&` (all the conditions set must be
/// present in the event in order to pass the filter).
///
/// - ids: a list of event ids or prefixes
/// - authors: a list of pubkeys or prefixes, the pubkey of an event must be one of these
/// - kinds: a list of kind numbers
/// - #e: a list of event ids that are referenced in an "e" tag
/// - #p: a list of pubkeys that are referenced in a "p" tag
/// - since: a timestamp. Events must be newer than this to pass
/// - until: a timestamp. Events must be older than this to pass
/// - limit: maximum number of events to be returned in the initial query
///
/// Keys that are not set are omitted from the wire shape altogether.
///
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Filter {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ids: Option<Vec<EventId>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub authors: Option<Vec<PubKey>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub kinds: Option<Vec<EventKind>>,
  #[serde(
    rename = "#e",
    alias = "e",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub e: Option<Vec<String>>,
  #[serde(
    rename = "#p",
    alias = "p",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub p: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub since: Option<Timestamp>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub until: Option<Timestamp>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub limit: Option<Timestamp>,
}

impl Filter {
  pub fn as_str(&self) -> String {
    serde_json::to_string(self).unwrap()
  }

  pub fn from_string(data: String) -> Result<Self, serde_json::error::Error> {
    serde_json::from_str(&data)
  }
}

/// Reference matcher: true iff `event` passes every condition
/// that `filter` has set.
pub fn check_event_match_filter(event: &Event, filter: &Filter) -> bool {
  // Check IDs
  if let Some(ids) = &filter.ids {
    let id_in_list = ids
      .iter()
      .any(|id| *id.0 == event.id || event.id.starts_with(&id.0));
    if !id_in_list {
      return false;
    }
  }

  // Check Authors
  if let Some(authors) = &filter.authors {
    let author_in_list = authors
      .iter()
      .any(|author| *author == event.pubkey || event.pubkey.starts_with(author.as_str()));
    if !author_in_list {
      return false;
    }
  }

  // Check Kinds
  if let Some(kinds) = &filter.kinds {
    let kind_in_list = kinds.iter().any(|kind| *kind == event.kind);
    if !kind_in_list {
      return false;
    }
  }

  // Check Since
  if let Some(since) = filter.since {
    if since > event.created_at {
      return false;
    }
  }

  // Check Until
  if let Some(until) = filter.until {
    if until < event.created_at {
      return false;
    }
  }

  // Check #e tag
  if let Some(event_ids) = &filter.e {
    match event
      .tags
      .iter()
      .position(|event_tag| TagKind::from(event_tag.clone()) == TagKind::Event)
    {
      Some(index) => {
        if let Tag::Event(event_event_tag_id, _, _) = &event.tags[index] {
          if !event_ids
            .iter()
            .any(|event_id| *event_id == event_event_tag_id.0)
          {
            return false;
          }
        }
      }
      None => return false,
    }
  }

  // Check #p tag
  if let Some(pubkeys) = &filter.p {
    match event
      .tags
      .iter()
      .position(|event_tag| TagKind::from(event_tag.clone()) == TagKind::PubKey)
    {
      Some(index) => {
        if let Tag::PubKey(event_pubkey_tag_pubkeys, _) = &event.tags[index] {
          if !pubkeys
            .iter()
            .any(|pubkey| event_pubkey_tag_pubkeys.contains(pubkey))
          {
            return false;
          }
        }
      }
      None => return false,
    }
  }

  true
}
