use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{Property, SupportCase, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Support cases: listings filter on status + origin, then narrow by
    // supporter (B2B) or property (B2C).
    create_indexes(
        db,
        SupportCase::COLLECTION,
        vec![
            index(bson::doc! { "case_status": 1, "opened_by": 1, "supporter_id": 1 }),
            index(bson::doc! { "case_status": 1, "opened_by": 1, "property_id": 1 }),
            index(bson::doc! { "supporter_id": 1, "created_at": -1 }),
            index(bson::doc! { "conversation.message_by.author_id": 1 }),
        ],
    )
    .await?;

    // Properties: ownership lookups for agent visibility.
    create_indexes(
        db,
        Property::COLLECTION,
        vec![index(bson::doc! { "belongs_to": 1 })],
    )
    .await?;

    create_indexes(
        db,
        User::COLLECTION,
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
