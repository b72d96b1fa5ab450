use bson::doc;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::data::{filter, sequence};
use crate::error::StoreResult;
use crate::middleware::paging::PageState;

pub static CONTENT_COLLECTION_NAME: &str = "contents";

fn default_description() -> String {
    "-".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseContent {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub video_url: Option<String>,
    pub course_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContent {
    pub name: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub course_id: i64,
    pub parent_id: Option<i64>,
}

impl NewContent {
    pub fn into_content(self, id: i64) -> CourseContent {
        let now = Utc::now();
        CourseContent {
            id,
            name: self.name,
            description: self.description.unwrap_or_else(default_description),
            video_url: self.video_url,
            course_id: self.course_id,
            parent_id: self.parent_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[rocket::async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_content(&self, content: NewContent) -> StoreResult<CourseContent>;

    async fn get_content(&self, id: i64) -> StoreResult<Option<CourseContent>>;

    async fn list_contents(&self, page: PageState) -> StoreResult<Vec<CourseContent>>;

    async fn count_contents(&self, course_id: i64) -> StoreResult<u64>;
}

#[rocket::async_trait]
impl ContentStore for Database {
    async fn create_content(&self, content: NewContent) -> StoreResult<CourseContent> {
        let id = sequence::next_id(self, CONTENT_COLLECTION_NAME).await?;
        let content = content.into_content(id);

        self.collection::<CourseContent>(CONTENT_COLLECTION_NAME)
            .insert_one(&content, None)
            .await?;

        Ok(content)
    }

    async fn get_content(&self, id: i64) -> StoreResult<Option<CourseContent>> {
        Ok(self
            .collection::<CourseContent>(CONTENT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn list_contents(&self, page: PageState) -> StoreResult<Vec<CourseContent>> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(page.skip())
            .limit(page.limit())
            .build();

        Ok(self
            .collection::<CourseContent>(CONTENT_COLLECTION_NAME)
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn count_contents(&self, course_id: i64) -> StoreResult<u64> {
        Ok(self
            .collection::<CourseContent>(CONTENT_COLLECTION_NAME)
            .count_documents(doc! { "course_id": course_id }, None)
            .await?)
    }
}
