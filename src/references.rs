use std::sync::Arc;

use crate::event::tag::Tag;
use crate::event::PubKey;
use crate::event_service::truncated_pubkey;
use crate::metadata_batcher::MetadataBatcher;
use crate::session::Session;

/// One piece of rendered event content. Profile mentions carry
/// whether their display data was already cached; unresolved ones
/// got a placeholder label and a queued lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
  Text(String),
  ProfileMention {
    pubkey: PubKey,
    label: String,
    resolved: bool,
  },
  NoteLink {
    event_id: String,
    label: String,
  },
}

/// Substitutes `#[n]` tag references in event content with render
/// labels. Never blocks on network I/O: cache misses get a
/// placeholder and a [`MetadataBatcher`] enqueue for later.
pub struct ReferenceResolver {
  session: Arc<Session>,
  batcher: Arc<MetadataBatcher>,
}

impl ReferenceResolver {
  pub fn new(session: Arc<Session>, batcher: Arc<MetadataBatcher>) -> Self {
    Self { session, batcher }
  }

  pub async fn resolve_references(&self, content: &str, tags: &[Tag]) -> Vec<ContentSegment> {
    let mut segments: Vec<ContentSegment> = vec![];
    let mut text = String::new();
    let mut rest = content;

    while let Some(start) = rest.find("#[") {
      let after_open = &rest[start + 2..];
      let reference = after_open.find(']').and_then(|close| {
        let digits = &after_open[..close];
        digits.parse::<usize>().ok().map(|index| (index, close))
      });

      match reference {
        Some((index, close)) => {
          text.push_str(&rest[..start]);
          let literal = &rest[start..start + 2 + close + 1];

          match self.resolve_tag_index(index, tags).await {
            Some(segment) => {
              if !text.is_empty() {
                segments.push(ContentSegment::Text(std::mem::take(&mut text)));
              }
              segments.push(segment);
            }
            // reference points at nothing usable, keep it as text
            None => text.push_str(literal),
          }

          rest = &rest[start + 2 + close + 1..];
        }
        None => {
          text.push_str(&rest[..start + 2]);
          rest = &rest[start + 2..];
        }
      }
    }
    text.push_str(rest);
    if !text.is_empty() {
      segments.push(ContentSegment::Text(text));
    }

    segments
  }

  async fn resolve_tag_index(&self, index: usize, tags: &[Tag]) -> Option<ContentSegment> {
    match tags.get(index)? {
      Tag::PubKey(pubkeys, _) => {
        let pubkey = pubkeys.first()?.clone();

        match self.session.display_info(&pubkey).await {
          Some(info) => Some(ContentSegment::ProfileMention {
            label: format!("@{}", info.display),
            pubkey,
            resolved: true,
          }),
          None => {
            self.batcher.enqueue(pubkey.clone(), false).await;
            Some(ContentSegment::ProfileMention {
              label: format!("@{}", truncated_pubkey(&pubkey)),
              pubkey,
              resolved: false,
            })
          }
        }
      }
      Tag::Event(event_id, _, _) => Some(ContentSegment::NoteLink {
        label: format!("note:{}", truncated_pubkey(&event_id.0)),
        event_id: event_id.0.clone(),
      }),
      Tag::Generic(_, _) => None,
    }
  }
}
