//! Case lifecycle: creation, appends, closing, seen-marks and deletion, with
//! the real-time and email side effects each one triggers.
//!
//! Every check that can fail (validation, existence, access) runs before the
//! write. Side effects run after it and can only log.

use std::collections::HashMap;
use std::sync::Arc;

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use realtydesk_db::models::{ActorRole, CaseStatus, Property, SeenTrack, SupportCase, User};
use serde::Serialize;
use tracing::{info, warn};

use super::caller::{Caller, CallerRole};
use super::conversation::{self, NewMessage, SeenScope};
use super::events::{Broadcaster, CaseEvent, TargetedCase};
use super::requests::{self, CreateCaseRequest, UpdateCaseRequest};
use super::view::CaseView;
use super::visibility::{self, ACCESS_DENIED, CaseQuery};
use crate::dao::base::{DaoError, DaoResult, UpdateOutcome};
use crate::dao::property::PropertyDao;
use crate::dao::support_case::{
    CASE_NOT_FOUND, CasePatch, MESSAGE_NOT_FOUND, NOTHING_UNSEEN, SupportCaseDao,
};
use crate::dao::user::UserDao;
use crate::notify::{CaseEmail, CaseNotifier, UNKNOWN_PROPERTY, template};

/// How widely a seen-mark applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenMode {
    /// Every message in the case.
    Blanket,
    /// Every message not written by the caller.
    ExcludeOwn,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeenResult {
    pub case_id: String,
    pub track: SeenTrack,
    pub modified: bool,
}

pub struct CaseLifecycle {
    cases: SupportCaseDao,
    properties: PropertyDao,
    users: UserDao,
    broadcaster: Arc<dyn Broadcaster>,
    notifier: Arc<dyn CaseNotifier>,
}

impl CaseLifecycle {
    pub fn new(
        db: &Database,
        broadcaster: Arc<dyn Broadcaster>,
        notifier: Arc<dyn CaseNotifier>,
    ) -> Self {
        Self {
            cases: SupportCaseDao::new(db),
            properties: PropertyDao::new(db),
            users: UserDao::new(db),
            broadcaster,
            notifier,
        }
    }

    pub async fn create_case(&self, caller: &Caller, req: CreateCaseRequest) -> DaoResult<CaseView> {
        requests::check(&req)?;
        let supporter_id = requests::parse_id(&req.supporter_id, "supporter_id")?;
        let owner_id = requests::parse_id(&req.owner_id, "owner_id")?;
        let property_id = requests::parse_optional_id(req.property_id.as_deref(), "property_id")?;

        let opened_by = caller.role.actor();
        let author_id = match opened_by {
            ActorRole::SuperAdmin => supporter_id,
            _ => owner_id,
        };

        let first = conversation::opening_message(
            opened_by,
            req.customer_name,
            req.customer_email,
            Some(author_id),
            req.inquiry_about,
            req.inquiry_details,
        )?;

        let now = DateTime::now();
        let case = SupportCase {
            id: None,
            case_status: CaseStatus::Open,
            opened_by,
            supporter_id: Some(supporter_id),
            supporter_name: req.supporter_name.unwrap_or_default(),
            property_id,
            display_name1: req.display_name1,
            display_name2: req.display_name2,
            closed_by: None,
            rating: None,
            conversation: vec![first],
            created_at: now,
            updated_at: now,
        };

        let case = self.cases.create(&case).await?;
        let case_id = case.id;
        info!(?case_id, opened_by = opened_by.as_str(), "Support case created");

        let (supporter, property) = self.related(&case).await?;
        let property_name = property_name(property.as_ref());
        let email = template::case_opened(&case, &property_name);
        let target_agent_id = property.as_ref().and_then(|p| p.belongs_to);
        let view = CaseView::build(case, supporter.as_ref(), property.as_ref());

        self.emit_global(CaseEvent::NewChat(TargetedCase {
            case: view.clone(),
            target_agent_id: target_agent_id.map(|id| id.to_hex()),
        }))
        .await;
        self.notify(email);

        Ok(view)
    }

    pub async fn get_case(&self, caller: &Caller, id: ObjectId) -> DaoResult<CaseView> {
        let case = self.readable(caller, id).await?;
        self.populate(case).await
    }

    /// Applies a partial update. Appending and closing can happen in the same
    /// call and land in one write.
    pub async fn update_case(
        &self,
        caller: &Caller,
        id: ObjectId,
        req: UpdateCaseRequest,
    ) -> DaoResult<CaseView> {
        if req.is_empty() {
            return Err(DaoError::Validation(
                "No valid fields provided for update".to_string(),
            ));
        }
        requests::check(&req)?;

        let current = self.readable(caller, id).await?;
        if req.reassigns() && !caller.role.is_staff() {
            return Err(DaoError::Forbidden(
                "Only staff can reassign a support case".to_string(),
            ));
        }
        let mut patch = CasePatch::default();

        if let Some(supporter_id) = requests::parse_optional_id(req.supporter_id.as_deref(), "supporter_id")? {
            patch.set.insert("supporter_id", supporter_id);
        }
        if let Some(property_id) = requests::parse_optional_id(req.property_id.as_deref(), "property_id")? {
            patch.set.insert("property_id", property_id);
        }
        if let Some(name) = req.supporter_name {
            patch.set.insert("supporter_name", name);
        }
        if let Some(rating) = req.rating {
            patch.set.insert("rating", rating as i32);
        }

        let closing = match req.case_status {
            Some(CaseStatus::Closed) => {
                if current.case_status == CaseStatus::Closed {
                    return Err(DaoError::Conflict("Support case is already closed".to_string()));
                }
                true
            }
            Some(CaseStatus::Open) if current.case_status == CaseStatus::Closed => {
                return Err(DaoError::Validation(
                    "Reopening a closed case is not supported".to_string(),
                ));
            }
            _ => false,
        };
        if req.closed_by.is_some() && !closing {
            return Err(DaoError::Validation(
                "closed_by can only be set when closing a case".to_string(),
            ));
        }

        let closed_by = req.closed_by.unwrap_or_else(|| caller.role.actor());
        if closing {
            patch.set.insert("case_status", CaseStatus::Closed.as_str());
            patch.set.insert("closed_by", closed_by.as_str());
            patch.require_open = true;
        }

        let appended = match req.message {
            Some(input) => {
                let display_name = input
                    .display_name
                    .filter(|n| !n.trim().is_empty())
                    .or_else(|| caller.display_name.clone())
                    .ok_or_else(|| DaoError::Validation("display_name is required".to_string()))?;
                let message = conversation::build_message(
                    NewMessage {
                        display_name,
                        contact_email: input.contact_email.or_else(|| caller.email.clone()),
                        author_id: caller.user_id,
                        message: input.message,
                        inquiry_about: input.inquiry_about,
                        inquiry_details: input.inquiry_details,
                    },
                    current.conversation.is_empty(),
                    Some(caller.role.actor()),
                )?;
                patch.push = Some(message);
                true
            }
            None => false,
        };

        if patch.is_empty() {
            return self.populate(current).await;
        }

        let updated = match self.cases.apply(id, patch).await? {
            Some(case) => case,
            // Lost a race: either someone closed it first or it is gone.
            None if closing => {
                return Err(match self.cases.find_by_id(id).await {
                    Ok(_) => DaoError::Conflict("Support case is already closed".to_string()),
                    Err(e) => e,
                });
            }
            None => return Err(DaoError::NotFound(CASE_NOT_FOUND.to_string())),
        };

        let (supporter, property) = self.related(&updated).await?;
        let closed_email = closing.then(|| {
            template::case_closed(&updated, &property_name(property.as_ref()), Some(closed_by))
        });
        let target_agent_id = property.as_ref().and_then(|p| p.belongs_to);
        let view = CaseView::build(updated, supporter.as_ref(), property.as_ref());

        if appended {
            self.emit_room(id, CaseEvent::ReceiveMessage(view.clone())).await;
        }
        if let Some(email) = closed_email {
            info!(case_id = %id, closed_by = closed_by.as_str(), "Support case closed");
            self.emit_global(CaseEvent::CloseCase {
                case: TargetedCase {
                    case: view.clone(),
                    target_agent_id: target_agent_id.map(|id| id.to_hex()),
                },
                closed_by: Some(closed_by),
            })
            .await;
            self.notify(email);
        }

        Ok(view)
    }

    pub async fn list_cases(&self, caller: &Caller, query: &CaseQuery) -> DaoResult<Vec<CaseView>> {
        let owned = match (visibility::needs_owned_properties(caller, query), caller.agent_id()) {
            (true, Some(agent_id)) => self.properties.owned_ids(agent_id).await?,
            _ => Vec::new(),
        };
        let filter = visibility::listing_filter(caller, query, &owned)?;
        let cases = self.cases.find_many(filter).await?;
        self.populate_many(cases).await
    }

    pub async fn list_for_property(
        &self,
        caller: &Caller,
        property_id: ObjectId,
        query: &CaseQuery,
    ) -> DaoResult<Vec<CaseView>> {
        let owner = self.properties.owner_of(property_id).await?;
        let filter = visibility::property_listing_filter(caller, query, property_id, owner)?;
        let cases = self.cases.find_many(filter).await?;
        self.populate_many(cases).await
    }

    pub async fn list_unassigned(&self, caller: &Caller) -> DaoResult<Vec<CaseView>> {
        require_super_admin(caller)?;
        let cases = self.cases.find_many(unassigned_filter()).await?;
        self.populate_many(cases).await
    }

    pub async fn count_unassigned(&self, caller: &Caller) -> DaoResult<u64> {
        require_super_admin(caller)?;
        self.cases.count(unassigned_filter()).await
    }

    /// Marks `track` seen on case `id`. Each track can only be flipped by the
    /// role that owns it.
    pub async fn mark_seen(
        &self,
        caller: &Caller,
        id: ObjectId,
        track: SeenTrack,
        mode: SeenMode,
    ) -> DaoResult<SeenResult> {
        let owns_track = caller.role != CallerRole::Unauthenticated
            && caller.role.actor().seen_track() == track;
        self.readable(caller, id).await?;
        if !owns_track {
            return Err(DaoError::Forbidden(ACCESS_DENIED.to_string()));
        }

        let scope = match (mode, caller.user_id) {
            (SeenMode::ExcludeOwn, Some(me)) => SeenScope::NotAuthoredBy(me),
            _ => SeenScope::All,
        };
        // Existence was checked above, so a miss means nothing is left to flip.
        let outcome = self.cases.mark_seen(id, track, scope).await?;
        if outcome.matched == 0 {
            return Err(DaoError::NotFound(NOTHING_UNSEEN.to_string()));
        }
        let modified = outcome.modified > 0;
        if modified {
            self.emit_room(
                id,
                CaseEvent::MessageSeen {
                    case_id: id.to_hex(),
                    user_id: caller.user_id.map(|u| u.to_hex()),
                    track,
                },
            )
            .await;
        }

        Ok(SeenResult {
            case_id: id.to_hex(),
            track,
            modified,
        })
    }

    /// Marks every track seen on every message of every case.
    pub async fn mark_everything_seen(&self, caller: &Caller) -> DaoResult<UpdateOutcome> {
        require_super_admin(caller)?;
        let outcome = self.cases.mark_everything_seen().await?;
        info!(matched = outcome.matched, modified = outcome.modified, "All messages marked seen");
        Ok(outcome)
    }

    pub async fn delete_message(
        &self,
        caller: &Caller,
        case_id: ObjectId,
        message_id: ObjectId,
    ) -> DaoResult<CaseView> {
        let case = self.readable(caller, case_id).await?;
        let position = case
            .conversation
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| DaoError::NotFound(MESSAGE_NOT_FOUND.to_string()))?;
        if position == 0 {
            return Err(DaoError::Validation(
                "The opening message of a case cannot be deleted".to_string(),
            ));
        }

        let updated = self
            .cases
            .pull_message(case_id, message_id)
            .await?
            .ok_or_else(|| DaoError::NotFound(MESSAGE_NOT_FOUND.to_string()))?;

        self.emit_room(
            case_id,
            CaseEvent::MessageDeleted {
                case_id: case_id.to_hex(),
                message_id: message_id.to_hex(),
            },
        )
        .await;

        self.populate(updated).await
    }

    /// Messages unseen by admins across all cases, ignoring the caller's own.
    pub async fn unseen_for_admin(&self, caller: &Caller) -> DaoResult<u64> {
        require_super_admin(caller)?;
        self.cases
            .count_unseen(doc! {}, SeenTrack::Admin, caller.user_id)
            .await
    }

    pub async fn unseen_for_property_agent(
        &self,
        caller: &Caller,
        property_id: ObjectId,
    ) -> DaoResult<u64> {
        let owner = self.properties.owner_of(property_id).await?;
        let allowed = caller.is_super_admin()
            || (caller.agent_id().is_some() && caller.agent_id() == owner);
        if !allowed {
            return Err(DaoError::Forbidden(ACCESS_DENIED.to_string()));
        }
        self.cases
            .count_unseen(doc! { "property_id": property_id }, SeenTrack::Agent, None)
            .await
    }

    /// Messages the client has not seen in open cases they take part in.
    pub async fn unseen_for_client(&self, caller: &Caller, client_id: ObjectId) -> DaoResult<u64> {
        if !caller.is_super_admin() && caller.user_id != Some(client_id) {
            return Err(DaoError::Forbidden(ACCESS_DENIED.to_string()));
        }
        self.cases
            .count_unseen(
                doc! {
                    "conversation.message_by.author_id": client_id,
                    "case_status": CaseStatus::Open.as_str(),
                },
                SeenTrack::Client,
                None,
            )
            .await
    }

    /// Gate for joining the real-time room of a case.
    pub async fn authorize_room(&self, caller: &Caller, case_id: ObjectId) -> DaoResult<()> {
        self.readable(caller, case_id).await.map(|_| ())
    }

    /// Loads a case and checks the caller may read it. 404 wins over 403.
    async fn readable(&self, caller: &Caller, id: ObjectId) -> DaoResult<SupportCase> {
        let case = self.cases.find_by_id(id).await?;
        let owner = match (caller.role, case.property_id) {
            (CallerRole::Agent, Some(property_id)) => self.properties.owner_of(property_id).await?,
            _ => None,
        };
        if !visibility::can_read(caller, &case, owner) {
            return Err(DaoError::Forbidden(ACCESS_DENIED.to_string()));
        }
        Ok(case)
    }

    async fn related(&self, case: &SupportCase) -> DaoResult<(Option<User>, Option<Property>)> {
        let supporter = match case.supporter_id {
            Some(id) => match self.users.find_by_id(id).await {
                Ok(user) => Some(user),
                Err(DaoError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        let property = match case.property_id {
            Some(id) => self.properties.find_by_id(id).await?,
            None => None,
        };
        Ok((supporter, property))
    }

    async fn populate(&self, case: SupportCase) -> DaoResult<CaseView> {
        let (supporter, property) = self.related(&case).await?;
        Ok(CaseView::build(case, supporter.as_ref(), property.as_ref()))
    }

    /// Expands supporters and properties of a listing with two batch reads.
    async fn populate_many(&self, cases: Vec<SupportCase>) -> DaoResult<Vec<CaseView>> {
        let mut supporter_ids: Vec<ObjectId> = cases.iter().filter_map(|c| c.supporter_id).collect();
        let mut property_ids: Vec<ObjectId> = cases.iter().filter_map(|c| c.property_id).collect();
        supporter_ids.sort();
        supporter_ids.dedup();
        property_ids.sort();
        property_ids.dedup();

        let users: HashMap<ObjectId, User> = self
            .users
            .find_by_ids(&supporter_ids)
            .await?
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u)))
            .collect();
        let properties: HashMap<ObjectId, Property> = self
            .properties
            .find_by_ids(&property_ids)
            .await?
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect();

        Ok(cases
            .into_iter()
            .map(|case| {
                let supporter = case.supporter_id.and_then(|id| users.get(&id));
                let property = case.property_id.and_then(|id| properties.get(&id));
                CaseView::build(case, supporter, property)
            })
            .collect())
    }

    async fn emit_room(&self, case_id: ObjectId, event: CaseEvent) {
        if let Err(e) = self.broadcaster.broadcast_to_room(case_id, &event).await {
            warn!(%case_id, event = event.name(), error = %e, "Room broadcast failed");
        }
    }

    async fn emit_global(&self, event: CaseEvent) {
        if let Err(e) = self.broadcaster.broadcast_global(&event).await {
            warn!(event = event.name(), error = %e, "Global broadcast failed");
        }
    }

    fn notify(&self, email: CaseEmail) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let subject = email.subject.clone();
            if let Err(e) = notifier.send(email).await {
                warn!(%subject, error = %e, "Case notification failed");
            }
        });
    }
}

fn unassigned_filter() -> Document {
    doc! { "supporter_id": null }
}

fn require_super_admin(caller: &Caller) -> DaoResult<()> {
    if caller.is_super_admin() {
        Ok(())
    } else {
        Err(DaoError::Forbidden(ACCESS_DENIED.to_string()))
    }
}

fn property_name(property: Option<&Property>) -> String {
    property
        .map(|p| p.property_name.clone())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_PROPERTY.to_string())
}
