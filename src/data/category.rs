use bson::doc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::data::{filter, is_duplicate_key, sequence};
use crate::error::{StoreError, StoreResult};

pub static CATEGORY_COLLECTION_NAME: &str = "categories";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
}

#[rocket::async_trait]
pub trait CategoryStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the name is taken.
    async fn create_category(&self, name: &str) -> StoreResult<Category>;

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn delete_category(&self, id: i64) -> StoreResult<bool>;
}

#[rocket::async_trait]
impl CategoryStore for Database {
    async fn create_category(&self, name: &str) -> StoreResult<Category> {
        let id = sequence::next_id(self, CATEGORY_COLLECTION_NAME).await?;
        let category = Category {
            id,
            name: name.to_string(),
        };

        match self
            .collection::<Category>(CATEGORY_COLLECTION_NAME)
            .insert_one(&category, None)
            .await
        {
            Ok(_) => Ok(category),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Conflict {
                entity: "category",
                key: category.name,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self
            .collection::<Category>(CATEGORY_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();

        Ok(self
            .collection::<Category>(CATEGORY_COLLECTION_NAME)
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        let result = self
            .collection::<Category>(CATEGORY_COLLECTION_NAME)
            .delete_one(filter::by_id(id), None)
            .await?;

        Ok(result.deleted_count > 0)
    }
}
