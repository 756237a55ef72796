use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use realtydesk_db::models::Property;

use super::base::{BaseDao, DaoError, DaoResult};

/// Read access to listed properties. Ownership (`belongs_to`) drives agent
/// visibility and event targeting.
pub struct PropertyDao {
    pub base: BaseDao<Property>,
}

impl PropertyDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Property::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        property_name: String,
        belongs_to: Option<ObjectId>,
        property_city: String,
    ) -> DaoResult<Property> {
        let now = DateTime::now();
        let property = Property {
            id: None,
            property_name,
            belongs_to,
            property_city,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&property).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Property>> {
        match self.base.find_by_id(id).await {
            Ok(property) => Ok(Some(property)),
            Err(DaoError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Property>> {
        self.base.find_by_ids(ids).await
    }

    /// Agent owning `property_id`, if the property exists and has one.
    pub async fn owner_of(&self, property_id: ObjectId) -> DaoResult<Option<ObjectId>> {
        Ok(self.find_by_id(property_id).await?.and_then(|p| p.belongs_to))
    }

    /// Ids of every property `agent_id` owns.
    pub async fn owned_ids(&self, agent_id: ObjectId) -> DaoResult<Vec<ObjectId>> {
        self.base
            .distinct_ids("_id", doc! { "belongs_to": agent_id })
            .await
    }
}
