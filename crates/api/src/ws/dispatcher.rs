use async_trait::async_trait;
use axum::extract::ws::Message;
use bson::oid::ObjectId;
use realtydesk_services::support::{BroadcastError, Broadcaster, CaseEvent};
use std::sync::Arc;
use tracing::debug;

use super::storage::{WsSender, WsStorage};

/// Queues `text` on each sender. Closed connections are skipped.
fn fan_out(senders: &[WsSender], text: &str) -> usize {
    senders
        .iter()
        .filter(|s| s.send(Message::text(text.to_string())).is_ok())
        .count()
}

/// Sends a JSON message to a single connection.
pub fn send_to_connection(ws_storage: &WsStorage, connection_id: &str, message: &serde_json::Value) {
    if let Some(sender) = ws_storage.sender(connection_id) {
        let text = serde_json::to_string(message).unwrap_or_default();
        if sender.send(Message::text(text)).is_err() {
            debug!(%connection_id, "Connection already closed");
        }
    }
}

/// Sends an event to everyone in `room` except `except`.
pub fn send_to_room(
    ws_storage: &WsStorage,
    room: ObjectId,
    event: &CaseEvent,
    except: Option<&str>,
) -> Result<usize, BroadcastError> {
    let text = serde_json::to_string(event)?;
    let senders = ws_storage.room_senders(room, except);
    Ok(fan_out(&senders, &text))
}

/// `Broadcaster` backed by the in-process connection registry.
pub struct WsBroadcaster {
    storage: Arc<WsStorage>,
}

impl WsBroadcaster {
    pub fn new(storage: Arc<WsStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Broadcaster for WsBroadcaster {
    async fn broadcast_to_room(&self, room: ObjectId, event: &CaseEvent) -> Result<(), BroadcastError> {
        let delivered = send_to_room(&self.storage, room, event, None)?;
        debug!(%room, event = event.name(), delivered, "Room event queued");
        Ok(())
    }

    async fn broadcast_global(&self, event: &CaseEvent) -> Result<(), BroadcastError> {
        let text = serde_json::to_string(event)?;
        let delivered = fan_out(&self.storage.staff_senders(), &text);
        debug!(event = event.name(), delivered, "Global event queued");
        Ok(())
    }
}
