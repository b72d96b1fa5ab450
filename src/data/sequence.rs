use bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Database;
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};

pub static COUNTER_COLLECTION_NAME: &str = "counters";

#[derive(Debug, Deserialize)]
struct Counter {
    seq: i64,
}

/// Allocates the next integer id for `collection`, starting at 1.
pub async fn next_id(db: &Database, collection: &str) -> StoreResult<i64> {
    let options = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();

    let counter = db
        .collection::<Counter>(COUNTER_COLLECTION_NAME)
        .find_one_and_update(
            doc! { "_id": collection },
            doc! { "$inc": { "seq": 1i64 } },
            options,
        )
        .await?;

    counter
        .map(|it| it.seq)
        .ok_or_else(|| StoreError::Vanished {
            entity: "counter",
            key: collection.to_string(),
        })
}
