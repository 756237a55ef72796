//! Which cases a caller may see.
//!
//! Everything here is pure: the controller resolves the caller's owned
//! properties up front and passes them in.

use bson::{doc, oid::ObjectId, Document};
use realtydesk_db::models::{ActorRole, CaseStatus, SupportCase};
use serde::{Deserialize, Serialize};

use super::caller::{Caller, CallerRole};
use crate::dao::base::{DaoError, DaoResult};

pub const ACCESS_DENIED: &str = "Access denied";

/// B2B cases were opened by staff, B2C cases by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    B2b,
    B2c,
}

/// Status/origin partition of a listing. `None` means "either".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CaseQuery {
    pub status: Option<CaseStatus>,
    pub origin: Option<Origin>,
}

impl Origin {
    pub fn openers(&self) -> Vec<&'static str> {
        match self {
            Origin::B2b => vec![ActorRole::Agent.as_str(), ActorRole::SuperAdmin.as_str()],
            Origin::B2c => vec![ActorRole::Client.as_str()],
        }
    }
}

/// Filter for the status/origin axes alone.
pub fn scope_filter(query: &CaseQuery) -> Document {
    let mut filter = Document::new();
    if let Some(status) = query.status {
        filter.insert("case_status", status.as_str());
    }
    if let Some(origin) = query.origin {
        filter.insert("opened_by", doc! { "$in": origin.openers() });
    }
    filter
}

/// Whether `listing_filter` needs the caller's owned property ids.
pub fn needs_owned_properties(caller: &Caller, query: &CaseQuery) -> bool {
    caller.role == CallerRole::Agent && query.origin != Some(Origin::B2b)
}

/// Full listing predicate for `caller`.
///
/// Agents see B2B cases assigned to them, and B2C cases that are assigned
/// to them or concern a property they own. Clients and anonymous callers
/// cannot use staff listings.
pub fn listing_filter(
    caller: &Caller,
    query: &CaseQuery,
    owned_property_ids: &[ObjectId],
) -> DaoResult<Document> {
    let mut filter = scope_filter(query);

    match caller.role {
        CallerRole::SuperAdmin => {}
        CallerRole::Agent => {
            let agent_id = caller
                .user_id
                .ok_or_else(|| DaoError::Forbidden(ACCESS_DENIED.to_string()))?;
            let owned = owned_property_ids.to_vec();
            match query.origin {
                Some(Origin::B2b) => {
                    filter.insert("supporter_id", agent_id);
                }
                Some(Origin::B2c) => {
                    filter.insert(
                        "$or",
                        vec![
                            doc! { "supporter_id": agent_id },
                            doc! { "property_id": { "$in": owned } },
                        ],
                    );
                }
                None => {
                    filter.insert(
                        "$or",
                        vec![
                            doc! { "supporter_id": agent_id },
                            doc! {
                                "opened_by": ActorRole::Client.as_str(),
                                "property_id": { "$in": owned },
                            },
                        ],
                    );
                }
            }
        }
        CallerRole::Client | CallerRole::Unauthenticated => {
            return Err(DaoError::Forbidden(ACCESS_DENIED.to_string()));
        }
    }

    Ok(filter)
}

/// Filter for listings of a single property, restricted to the owning agent
/// and super-admins.
pub fn property_listing_filter(
    caller: &Caller,
    query: &CaseQuery,
    property_id: ObjectId,
    property_owner: Option<ObjectId>,
) -> DaoResult<Document> {
    let allowed = caller.is_super_admin()
        || (caller.agent_id().is_some() && caller.agent_id() == property_owner);
    if !allowed {
        return Err(DaoError::Forbidden(ACCESS_DENIED.to_string()));
    }

    let mut filter = scope_filter(query);
    filter.insert("property_id", property_id);
    Ok(filter)
}

/// Single-case read check. `property_owner` is the agent owning the case's
/// property, if any.
pub fn can_read(caller: &Caller, case: &SupportCase, property_owner: Option<ObjectId>) -> bool {
    match caller.role {
        CallerRole::SuperAdmin => true,
        CallerRole::Agent => match caller.user_id {
            Some(me) => case.supporter_id == Some(me) || property_owner == Some(me),
            None => false,
        },
        CallerRole::Client => caller.user_id.is_some_and(|me| case.has_participant(me)),
        CallerRole::Unauthenticated => false,
    }
}
