use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Read-side view of a listed property. The core only needs its name and
/// owning agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub property_name: String,
    /// Agent that owns the listing.
    pub belongs_to: Option<ObjectId>,
    #[serde(default)]
    pub property_city: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Property {
    pub const COLLECTION: &'static str = "properties";
}
