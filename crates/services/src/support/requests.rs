use bson::oid::ObjectId;
use realtydesk_db::models::{ActorRole, CaseStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dao::base::{DaoError, DaoResult};

/// Body of `POST /api/support-cases/new`. Missing strings deserialize as
/// empty and are rejected by validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CreateCaseRequest {
    #[validate(length(min = 1, message = "customer_name is required"))]
    pub customer_name: String,
    pub customer_email: Option<String>,
    #[validate(length(min = 1, message = "inquiry_about is required"))]
    pub inquiry_about: String,
    #[validate(length(min = 1, message = "inquiry_details is required"))]
    pub inquiry_details: String,
    #[validate(length(min = 1, message = "supporter_id is required"))]
    pub supporter_id: String,
    #[validate(length(min = 1, message = "owner_id is required"))]
    pub owner_id: String,
    pub property_id: Option<String>,
    #[validate(length(min = 1, message = "display_name1 is required"))]
    pub display_name1: String,
    #[validate(length(min = 1, message = "display_name2 is required"))]
    pub display_name2: String,
    pub supporter_name: Option<String>,
}

/// Body of `PUT /api/support-cases/{id}`. Any subset of fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateCaseRequest {
    pub supporter_id: Option<String>,
    pub case_status: Option<CaseStatus>,
    /// A message to append.
    #[serde(alias = "conversation")]
    #[validate(nested)]
    pub message: Option<AppendMessage>,
    pub closed_by: Option<ActorRole>,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: Option<u8>,
    pub supporter_name: Option<String>,
    pub property_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppendMessage {
    /// Falls back to the caller's display name.
    pub display_name: Option<String>,
    pub contact_email: Option<String>,
    #[validate(length(min = 1, message = "Message body is required"))]
    pub message: String,
    pub inquiry_about: Option<String>,
    pub inquiry_details: Option<String>,
}

impl UpdateCaseRequest {
    pub fn is_empty(&self) -> bool {
        self.supporter_id.is_none()
            && self.case_status.is_none()
            && self.message.is_none()
            && self.closed_by.is_none()
            && self.rating.is_none()
            && self.supporter_name.is_none()
            && self.property_id.is_none()
    }

    /// Whether the update touches who handles the case or which property it
    /// concerns.
    pub fn reassigns(&self) -> bool {
        self.supporter_id.is_some() || self.supporter_name.is_some() || self.property_id.is_some()
    }
}

pub fn check<T: Validate>(req: &T) -> DaoResult<()> {
    req.validate()
        .map_err(|e| DaoError::Validation(e.to_string()))
}

pub fn parse_id(value: &str, field: &str) -> DaoResult<ObjectId> {
    ObjectId::parse_str(value.trim())
        .map_err(|_| DaoError::Validation(format!("Invalid {field}")))
}

pub fn parse_optional_id(value: Option<&str>, field: &str) -> DaoResult<Option<ObjectId>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_id(v, field).map(Some),
    }
}
