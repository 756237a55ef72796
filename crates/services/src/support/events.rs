use async_trait::async_trait;
use bson::oid::ObjectId;
use realtydesk_db::models::{ActorRole, SeenTrack};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::view::CaseView;

/// Real-time notifications about case state. Encoded as
/// `{ "type": <event name>, "data": <payload> }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum CaseEvent {
    /// Global. Receivers keep it if they are `target_agent_id` or a super-admin.
    NewChat(TargetedCase),
    /// Global, same targeting as `NewChat`.
    CloseCase {
        case: TargetedCase,
        closed_by: Option<ActorRole>,
    },
    /// Room-scoped; carries the whole updated case.
    ReceiveMessage(CaseView),
    MessageDeleted {
        case_id: String,
        message_id: String,
    },
    MessageSeen {
        case_id: String,
        user_id: Option<String>,
        track: SeenTrack,
    },
    Typing(PresenceSignal),
    StopTyping(PresenceSignal),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetedCase {
    #[serde(flatten)]
    pub case: CaseView,
    /// Agent owning the case's property, if any.
    pub target_agent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceSignal {
    pub case_id: String,
    pub user: serde_json::Value,
}

impl CaseEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CaseEvent::NewChat(_) => "newChat",
            CaseEvent::CloseCase { .. } => "closeCase",
            CaseEvent::ReceiveMessage(_) => "receiveMessage",
            CaseEvent::MessageDeleted { .. } => "messageDeleted",
            CaseEvent::MessageSeen { .. } => "messageSeen",
            CaseEvent::Typing(_) => "typing",
            CaseEvent::StopTyping(_) => "stopTyping",
        }
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport unavailable: {0}")]
    Transport(String),
}

/// Fan-out of case events. Room = case id.
///
/// Implementations must hand events off without waiting on remote peers;
/// callers invoke them after the write has committed and only log failures.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_to_room(&self, room: ObjectId, event: &CaseEvent) -> Result<(), BroadcastError>;

    async fn broadcast_global(&self, event: &CaseEvent) -> Result<(), BroadcastError>;
}
