use bson::doc;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::data::{is_duplicate_key, sequence};
use crate::error::StoreResult;

pub static BOOKMARK_COLLECTION_NAME: &str = "bookmarks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(rename = "_id")]
    pub id: i64,
    pub student: i64,
    pub content: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[rocket::async_trait]
pub trait BookmarkStore: Send + Sync {
    /// `None` when the student already bookmarked this content.
    async fn create_bookmark(&self, student: i64, content: i64) -> StoreResult<Option<Bookmark>>;

    async fn list_bookmarks(&self, student: i64) -> StoreResult<Vec<Bookmark>>;

    /// Only deletes bookmarks belonging to `student`.
    async fn delete_bookmark(&self, id: i64, student: i64) -> StoreResult<bool>;
}

#[rocket::async_trait]
impl BookmarkStore for Database {
    async fn create_bookmark(&self, student: i64, content: i64) -> StoreResult<Option<Bookmark>> {
        let id = sequence::next_id(self, BOOKMARK_COLLECTION_NAME).await?;
        let bookmark = Bookmark {
            id,
            student,
            content,
            created_at: Utc::now(),
        };

        match self
            .collection::<Bookmark>(BOOKMARK_COLLECTION_NAME)
            .insert_one(&bookmark, None)
            .await
        {
            Ok(_) => Ok(Some(bookmark)),
            Err(e) if is_duplicate_key(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_bookmarks(&self, student: i64) -> StoreResult<Vec<Bookmark>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();

        Ok(self
            .collection::<Bookmark>(BOOKMARK_COLLECTION_NAME)
            .find(doc! { "student": student }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn delete_bookmark(&self, id: i64, student: i64) -> StoreResult<bool> {
        let result = self
            .collection::<Bookmark>(BOOKMARK_COLLECTION_NAME)
            .delete_one(doc! { "_id": id, "student": student }, None)
            .await?;

        Ok(result.deleted_count > 0)
    }
}
