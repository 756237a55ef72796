use bson::oid::ObjectId;
use realtydesk_db::models::{
    ActorRole, CaseStatus, ConversationMessage, Property, SupportCase, User,
};
use serde::{Deserialize, Serialize};

/// Wire shape of a case: ids as hex strings, supporter and property expanded
/// when they could be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseView {
    pub id: String,
    pub case_status: CaseStatus,
    pub opened_by: ActorRole,
    pub supporter_id: Option<String>,
    pub supporter_name: String,
    pub property_id: Option<String>,
    pub display_name1: String,
    pub display_name2: String,
    pub closed_by: Option<ActorRole>,
    pub rating: Option<u8>,
    pub conversation: Vec<MessageView>,
    pub created_at: String,
    pub updated_at: String,
    pub supporter: Option<SupporterView>,
    pub property: Option<PropertyView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub message_by: AuthorView,
    pub message: String,
    pub date: String,
    pub inquiry_about: Option<String>,
    pub inquiry_details: Option<String>,
    pub seen_by_admin: bool,
    pub seen_by_agent: bool,
    pub seen_by_client: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorView {
    pub display_name: String,
    pub contact_email: String,
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupporterView {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyView {
    pub id: String,
    pub property_name: String,
    pub belongs_to: Option<String>,
}

impl CaseView {
    pub fn build(case: SupportCase, supporter: Option<&User>, property: Option<&Property>) -> Self {
        Self {
            id: hex(case.id),
            case_status: case.case_status,
            opened_by: case.opened_by,
            supporter_id: case.supporter_id.map(|id| id.to_hex()),
            supporter_name: case.supporter_name,
            property_id: case.property_id.map(|id| id.to_hex()),
            display_name1: case.display_name1,
            display_name2: case.display_name2,
            closed_by: case.closed_by,
            rating: case.rating,
            conversation: case.conversation.into_iter().map(MessageView::from).collect(),
            created_at: case.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: case.updated_at.try_to_rfc3339_string().unwrap_or_default(),
            supporter: supporter.map(SupporterView::from),
            property: property.map(PropertyView::from),
        }
    }
}

impl From<ConversationMessage> for MessageView {
    fn from(m: ConversationMessage) -> Self {
        Self {
            id: m.id.to_hex(),
            message_by: AuthorView {
                display_name: m.message_by.display_name,
                contact_email: m.message_by.contact_email,
                author_id: m.message_by.author_id.map(|id| id.to_hex()),
            },
            message: m.message,
            date: m.date.try_to_rfc3339_string().unwrap_or_default(),
            inquiry_about: m.inquiry_about,
            inquiry_details: m.inquiry_details,
            seen_by_admin: m.seen_by_admin,
            seen_by_agent: m.seen_by_agent,
            seen_by_client: m.seen_by_client,
        }
    }
}

impl From<&User> for SupporterView {
    fn from(u: &User) -> Self {
        Self {
            id: hex(u.id),
            display_name: u.display_name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

impl From<&Property> for PropertyView {
    fn from(p: &Property) -> Self {
        Self {
            id: hex(p.id),
            property_name: p.property_name.clone(),
            belongs_to: p.belongs_to.map(|id| id.to_hex()),
        }
    }
}

fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}
