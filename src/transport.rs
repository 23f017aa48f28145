use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

use crate::client_to_relay_communication::close::ClientToRelayCommClose;
use crate::client_to_relay_communication::event::ClientToRelayCommEvent;
use crate::client_to_relay_communication::request::ClientToRelayCommRequest;
use crate::event::Event;
use crate::filter::Filter;
use crate::relay_to_client_communication::RelayToClientMessage;
use crate::relay_url::RelayUrl;

/// How a single relay is asked for events or handed a publish.
///
/// Unreachable relays, timeouts and malformed frames all collapse
/// into an empty result or a `false` ack; lookup failure is never
/// distinguishable from "not found" at this seam.
#[async_trait]
pub trait RelayFetcher: Send + Sync {
  /// One-shot list query: REQ, collect EVENT frames until EOSE,
  /// CLOSE, disconnect.
  async fn fetch_events(&self, relay_url: &RelayUrl, filters: Vec<Filter>) -> Vec<Event>;

  /// Publishes one event and waits for the relay's accept/reject
  /// report. A missing or negative report is `false`.
  async fn publish(&self, relay_url: &RelayUrl, event: Event) -> bool;
}

/// [`RelayFetcher`] over a real websocket connection.
pub struct WebSocketFetcher {
  operation_timeout: Duration,
}

impl Default for WebSocketFetcher {
  fn default() -> Self {
    Self::new(Duration::from_secs(10))
  }
}

impl WebSocketFetcher {
  pub fn new(operation_timeout: Duration) -> Self {
    Self { operation_timeout }
  }

  async fn fetch_events_inner(&self, relay_url: &RelayUrl, filters: Vec<Filter>) -> Vec<Event> {
    debug!("❯ Connecting to {relay_url}");

    let ws_stream = match connect_async(relay_url.as_str()).await {
      Ok((ws_stream, _)) => ws_stream,
      Err(err) => {
        error!("Impossible to connect to {relay_url}: {err}");
        return vec![];
      }
    };
    info!("❯ Connected to {relay_url}");
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let subscription_id = Uuid::new_v4().to_string();
    let request = ClientToRelayCommRequest::new_request(subscription_id.clone(), filters);
    if let Err(err) = ws_tx.send(Message::Text(request.as_json())).await {
      error!("Could not send request to {relay_url}: {err}");
      return vec![];
    }

    let mut events: Vec<Event> = vec![];
    while let Some(msg_res) = ws_rx.next().await {
      let msg = match msg_res {
        Ok(Message::Text(msg)) => msg,
        Ok(_) => continue,
        Err(err) => {
          debug!("Connection to {relay_url} dropped: {err}");
          break;
        }
      };

      match RelayToClientMessage::from_json(msg) {
        Ok(RelayToClientMessage::Event(event_msg)) => {
          if event_msg.subscription_id == subscription_id {
            events.push(event_msg.event);
          }
        }
        Ok(RelayToClientMessage::Eose(eose)) => {
          if eose.subscription_id == subscription_id {
            break;
          }
        }
        Ok(RelayToClientMessage::Notice(notice)) => {
          debug!("Notice from {relay_url}: {}", notice.message);
        }
        Ok(RelayToClientMessage::Ok(_)) => {}
        Err(err) => debug!("Skipping frame from {relay_url}: {err}"),
      }
    }

    // close the subscription and the socket on every exit
    let close = ClientToRelayCommClose::new_close(subscription_id);
    let _ = ws_tx.send(Message::Text(close.as_json())).await;
    let _ = ws_tx.close().await;

    events
  }

  async fn publish_inner(&self, relay_url: &RelayUrl, event: Event) -> bool {
    debug!("❯ Connecting to {relay_url}");

    let ws_stream = match connect_async(relay_url.as_str()).await {
      Ok((ws_stream, _)) => ws_stream,
      Err(err) => {
        error!("Impossible to connect to {relay_url}: {err}");
        return false;
      }
    };
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let event_id = event.id.clone();
    let publish = ClientToRelayCommEvent::new_event(event);
    if let Err(err) = ws_tx.send(Message::Text(publish.as_json())).await {
      error!("Could not send event to {relay_url}: {err}");
      return false;
    }

    let mut accepted = false;
    while let Some(msg_res) = ws_rx.next().await {
      let msg = match msg_res {
        Ok(Message::Text(msg)) => msg,
        Ok(_) => continue,
        Err(err) => {
          debug!("Connection to {relay_url} dropped: {err}");
          break;
        }
      };

      match RelayToClientMessage::from_json(msg) {
        Ok(RelayToClientMessage::Ok(report)) if report.event_id == event_id => {
          if !report.accepted {
            info!("Event rejected by {relay_url}: {}", report.message);
          }
          accepted = report.accepted;
          break;
        }
        Ok(RelayToClientMessage::Notice(notice)) => {
          debug!("Notice from {relay_url}: {}", notice.message);
        }
        Ok(_) => {}
        Err(err) => debug!("Skipping frame from {relay_url}: {err}"),
      }
    }

    let _ = ws_tx.close().await;

    accepted
  }
}

#[async_trait]
impl RelayFetcher for WebSocketFetcher {
  async fn fetch_events(&self, relay_url: &RelayUrl, filters: Vec<Filter>) -> Vec<Event> {
    match timeout(
      self.operation_timeout,
      self.fetch_events_inner(relay_url, filters),
    )
    .await
    {
      Ok(events) => events,
      Err(_) => {
        debug!("Query against {relay_url} timed out");
        vec![]
      }
    }
  }

  async fn publish(&self, relay_url: &RelayUrl, event: Event) -> bool {
    match timeout(self.operation_timeout, self.publish_inner(relay_url, event)).await {
      Ok(accepted) => accepted,
      Err(_) => {
        debug!("Publish to {relay_url} timed out");
        false
      }
    }
  }
}
