use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportCase {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub case_status: CaseStatus,
    pub opened_by: ActorRole,
    pub supporter_id: Option<ObjectId>,
    #[serde(default)]
    pub supporter_name: String,
    pub property_id: Option<ObjectId>,
    pub display_name1: String,
    pub display_name2: String,
    pub closed_by: Option<ActorRole>,
    pub rating: Option<u8>,
    #[serde(default)]
    pub conversation: Vec<ConversationMessage>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// One entry of a case's conversation. Lives only inside its case document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub message_by: MessageAuthor,
    pub message: String,
    pub date: DateTime,
    pub inquiry_about: Option<String>,
    pub inquiry_details: Option<String>,
    #[serde(default)]
    pub seen_by_admin: bool,
    #[serde(default)]
    pub seen_by_agent: bool,
    #[serde(default)]
    pub seen_by_client: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub display_name: String,
    pub contact_email: String,
    /// `None` for guest senders.
    pub author_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Open,
    Closed,
}

/// Who opened or closed a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    SuperAdmin,
    Agent,
    Client,
}

/// Seen track of a conversation message. Each track is flipped by its own
/// role only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeenTrack {
    Admin,
    Agent,
    Client,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::Closed => "closed",
        }
    }
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::SuperAdmin => "super_admin",
            ActorRole::Agent => "agent",
            ActorRole::Client => "client",
        }
    }

    /// The seen track this role owns.
    pub fn seen_track(&self) -> SeenTrack {
        match self {
            ActorRole::SuperAdmin => SeenTrack::Admin,
            ActorRole::Agent => SeenTrack::Agent,
            ActorRole::Client => SeenTrack::Client,
        }
    }
}

impl SeenTrack {
    /// Field name of this track inside a conversation message.
    pub fn field(&self) -> &'static str {
        match self {
            SeenTrack::Admin => "seen_by_admin",
            SeenTrack::Agent => "seen_by_agent",
            SeenTrack::Client => "seen_by_client",
        }
    }

    pub fn all() -> [SeenTrack; 3] {
        [SeenTrack::Admin, SeenTrack::Agent, SeenTrack::Client]
    }
}

impl SupportCase {
    pub const COLLECTION: &'static str = "support_cases";

    pub fn has_participant(&self, user_id: ObjectId) -> bool {
        self.supporter_id == Some(user_id)
            || self
                .conversation
                .iter()
                .any(|m| m.message_by.author_id == Some(user_id))
    }
}
