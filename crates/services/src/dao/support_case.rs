use bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::Database;
use realtydesk_db::models::{CaseStatus, ConversationMessage, SeenTrack, SupportCase};

use super::base::{BaseDao, DaoError, DaoResult, UpdateOutcome};
use crate::support::conversation::{self, SeenScope};

pub const CASE_NOT_FOUND: &str = "Support case not found";
pub const MESSAGE_NOT_FOUND: &str = "Message not found in this case";
pub const NOTHING_UNSEEN: &str = "No unseen messages to mark";

pub struct SupportCaseDao {
    pub base: BaseDao<SupportCase>,
}

/// A partial update of a case. Every present part lands in one atomic write.
#[derive(Debug, Default)]
pub struct CasePatch {
    pub set: Document,
    pub push: Option<ConversationMessage>,
    /// Only apply while the case is still open.
    pub require_open: bool,
}

impl CasePatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.push.is_none()
    }
}

impl SupportCaseDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, SupportCase::COLLECTION),
        }
    }

    pub async fn create(&self, case: &SupportCase) -> DaoResult<SupportCase> {
        let id = self.base.insert_one(case).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<SupportCase> {
        self.base
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| DaoError::NotFound(CASE_NOT_FOUND.to_string()))
    }

    /// Newest first.
    pub async fn find_many(&self, filter: Document) -> DaoResult<Vec<SupportCase>> {
        self.base
            .find_many(filter, Some(doc! { "created_at": -1 }))
            .await
    }

    pub async fn count(&self, filter: Document) -> DaoResult<u64> {
        self.base.count(filter).await
    }

    /// Applies `patch` and returns the case as written, or `None` when no
    /// case matched (missing, or already closed under `require_open`).
    pub async fn apply(&self, id: ObjectId, patch: CasePatch) -> DaoResult<Option<SupportCase>> {
        let mut filter = doc! { "_id": id };
        if patch.require_open {
            filter.insert("case_status", CaseStatus::Open.as_str());
        }

        let mut update = Document::new();
        if !patch.set.is_empty() {
            update.insert("$set", patch.set);
        }
        if let Some(message) = patch.push {
            update.insert("$push", doc! { "conversation": bson::to_bson(&message)? });
        }

        self.base.find_one_and_update(filter, update, None).await
    }

    /// Flips `track` on the messages in `scope`. Cases with nothing left to
    /// flip are not matched, so repeating a mark writes nothing.
    pub async fn mark_seen(
        &self,
        id: ObjectId,
        track: SeenTrack,
        scope: SeenScope,
    ) -> DaoResult<UpdateOutcome> {
        let (update, array_filters) = conversation::seen_update(track, scope);
        let filter = doc! {
            "_id": id,
            "conversation": conversation::seen_pending(track, scope),
        };
        self.base.update_one(filter, update, array_filters).await
    }

    pub async fn mark_everything_seen(&self) -> DaoResult<UpdateOutcome> {
        self.base
            .update_many(doc! {}, conversation::seen_everything_update())
            .await
    }

    /// Removes message `message_id` from the case. The opening message is
    /// never matched; `None` means the guarded write found nothing to pull.
    pub async fn pull_message(
        &self,
        case_id: ObjectId,
        message_id: ObjectId,
    ) -> DaoResult<Option<SupportCase>> {
        self.base
            .find_one_and_update(
                doc! {
                    "_id": case_id,
                    "conversation._id": message_id,
                    "conversation.0._id": { "$ne": message_id },
                },
                doc! { "$pull": { "conversation": { "_id": message_id } } },
                None,
            )
            .await
    }

    /// Number of messages unseen on `track` across cases matching `case_match`.
    pub async fn count_unseen(
        &self,
        case_match: Document,
        track: SeenTrack,
        exclude_author: Option<ObjectId>,
    ) -> DaoResult<u64> {
        let pipeline = conversation::unseen_count_pipeline(case_match, track, exclude_author);
        let rows = self.base.aggregate(pipeline).await?;
        Ok(rows
            .first()
            .and_then(|row| match row.get("unseen") {
                Some(Bson::Int32(n)) => Some(*n as u64),
                Some(Bson::Int64(n)) => Some(*n as u64),
                _ => None,
            })
            .unwrap_or(0))
    }
}
