//! Conversation log rules: message synthesis, validation and the update
//! documents used to mark messages as seen.
//!
//! Every write built here is a targeted update operator (`$push`, `$pull`,
//! positional `$set`) so concurrent writers on the same case never clobber
//! each other's messages.

use bson::{doc, oid::ObjectId, DateTime, Document};
use realtydesk_db::models::{ActorRole, ConversationMessage, MessageAuthor, SeenTrack};
use serde::{Deserialize, Serialize};

use crate::dao::base::{DaoError, DaoResult};

pub const CLIENT_OPENING_TEXT: &str = "A representative will be with you shortly.";
pub const FALLBACK_CONTACT_EMAIL: &str = "no-email@example.com";

/// Message content as submitted by a sender, before it joins a conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMessage {
    pub display_name: String,
    pub contact_email: Option<String>,
    pub author_id: Option<ObjectId>,
    pub message: String,
    pub inquiry_about: Option<String>,
    pub inquiry_details: Option<String>,
}

/// Which messages a seen-mark applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenScope {
    All,
    /// Every message except those authored by this identity.
    NotAuthoredBy(ObjectId),
}

/// Text of the synthesized first message, chosen by who opened the case.
pub fn opening_text(opened_by: ActorRole) -> String {
    match opened_by {
        ActorRole::Client => CLIENT_OPENING_TEXT.to_string(),
        ActorRole::SuperAdmin => "New support case created by Platform Administration".to_string(),
        ActorRole::Agent => "New support case created by agent".to_string(),
    }
}

/// Builds the opening inquiry of a new case. The opener's own track starts
/// seen, the other two start unseen.
pub fn opening_message(
    opened_by: ActorRole,
    display_name: String,
    contact_email: Option<String>,
    author_id: Option<ObjectId>,
    inquiry_about: String,
    inquiry_details: String,
) -> DaoResult<ConversationMessage> {
    build_message(
        NewMessage {
            display_name,
            contact_email,
            author_id,
            message: opening_text(opened_by),
            inquiry_about: Some(inquiry_about),
            inquiry_details: Some(inquiry_details),
        },
        true,
        Some(opened_by),
    )
}

/// Validates `input` and turns it into a conversation entry.
///
/// `is_first` demands `inquiry_about`. `author_role`, when known, marks the
/// sender's own track as seen.
pub fn build_message(
    input: NewMessage,
    is_first: bool,
    author_role: Option<ActorRole>,
) -> DaoResult<ConversationMessage> {
    if input.message.trim().is_empty() {
        return Err(DaoError::Validation("Message body is required".to_string()));
    }

    let inquiry_about = non_blank(input.inquiry_about);
    if is_first && inquiry_about.is_none() {
        return Err(DaoError::Validation(
            "inquiry_about is required on the first message of a case".to_string(),
        ));
    }

    let own_track = author_role.map(|r| r.seen_track());

    Ok(ConversationMessage {
        id: ObjectId::new(),
        message_by: MessageAuthor {
            display_name: input.display_name,
            contact_email: non_blank(input.contact_email)
                .unwrap_or_else(|| FALLBACK_CONTACT_EMAIL.to_string()),
            author_id: input.author_id,
        },
        message: input.message,
        date: DateTime::now(),
        inquiry_about,
        inquiry_details: non_blank(input.inquiry_details),
        seen_by_admin: own_track == Some(SeenTrack::Admin),
        seen_by_agent: own_track == Some(SeenTrack::Agent),
        seen_by_client: own_track == Some(SeenTrack::Client),
    })
}

/// Update document (and array filters) setting `track` on the messages in
/// `scope`. Only ever writes `true`.
pub fn seen_update(track: SeenTrack, scope: SeenScope) -> (Document, Option<Vec<Document>>) {
    match scope {
        SeenScope::All => (
            doc! { "$set": { format!("conversation.$[].{}", track.field()): true } },
            None,
        ),
        SeenScope::NotAuthoredBy(author) => (
            doc! { "$set": { format!("conversation.$[elem].{}", track.field()): true } },
            Some(vec![doc! {
                "elem.message_by.author_id": { "$ne": author },
                format!("elem.{}", track.field()): false,
            }]),
        ),
    }
}

/// Element match for messages that `seen_update` would still flip. Used to
/// skip the write entirely when there is nothing left to mark.
pub fn seen_pending(track: SeenTrack, scope: SeenScope) -> Document {
    let mut pending = doc! { track.field(): false };
    if let SeenScope::NotAuthoredBy(author) = scope {
        pending.insert("message_by.author_id", doc! { "$ne": author });
    }
    doc! { "$elemMatch": pending }
}

/// Marks every track on every message of a document.
pub fn seen_everything_update() -> Document {
    let mut set = Document::new();
    for track in SeenTrack::all() {
        set.insert(format!("conversation.$[].{}", track.field()), true);
    }
    doc! { "$set": set }
}

/// Aggregation counting messages unseen on `track` across cases matching
/// `case_match`, optionally ignoring messages written by `exclude_author`.
pub fn unseen_count_pipeline(
    case_match: Document,
    track: SeenTrack,
    exclude_author: Option<ObjectId>,
) -> Vec<Document> {
    let mut message_match = doc! { format!("conversation.{}", track.field()): false };
    if let Some(author) = exclude_author {
        message_match.insert("conversation.message_by.author_id", doc! { "$ne": author });
    }

    vec![
        doc! { "$match": case_match },
        doc! { "$unwind": "$conversation" },
        doc! { "$match": message_match },
        doc! { "$count": "unseen" },
    ]
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
