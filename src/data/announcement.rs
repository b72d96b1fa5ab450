use bson::doc;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::data::{filter, sequence};
use crate::error::{StoreError, StoreResult};

pub static ANNOUNCEMENT_COLLECTION_NAME: &str = "announcements";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(rename = "_id")]
    pub id: i64,
    pub course: i64,
    /// Author; always the course owner at creation time.
    pub teacher: i64,
    pub title: String,
    pub content: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub course: i64,
    pub teacher: i64,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
}

impl NewAnnouncement {
    pub fn into_announcement(self, id: i64) -> Announcement {
        let now = Utc::now();
        Announcement {
            id,
            course: self.course,
            teacher: self.teacher,
            title: self.title,
            content: self.content,
            date: self.date,
            created_at: now,
            updated_at: now,
        }
    }
}

#[rocket::async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn create_announcement(&self, announcement: NewAnnouncement)
        -> StoreResult<Announcement>;

    async fn get_announcement(&self, id: i64) -> StoreResult<Option<Announcement>>;

    async fn list_announcements(&self, course: i64) -> StoreResult<Vec<Announcement>>;

    async fn update_announcement(&self, announcement: &Announcement) -> StoreResult<()>;

    async fn delete_announcement(&self, id: i64) -> StoreResult<bool>;
}

#[rocket::async_trait]
impl AnnouncementStore for Database {
    async fn create_announcement(
        &self,
        announcement: NewAnnouncement,
    ) -> StoreResult<Announcement> {
        let id = sequence::next_id(self, ANNOUNCEMENT_COLLECTION_NAME).await?;
        let announcement = announcement.into_announcement(id);

        self.collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .insert_one(&announcement, None)
            .await?;

        Ok(announcement)
    }

    async fn get_announcement(&self, id: i64) -> StoreResult<Option<Announcement>> {
        Ok(self
            .collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn list_announcements(&self, course: i64) -> StoreResult<Vec<Announcement>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();

        Ok(self
            .collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .find(doc! { "course": course }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn update_announcement(&self, announcement: &Announcement) -> StoreResult<()> {
        let result = self
            .collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .replace_one(filter::by_id(announcement.id), announcement, None)
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::Vanished {
                entity: "announcement",
                key: announcement.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_announcement(&self, id: i64) -> StoreResult<bool> {
        let result = self
            .collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .delete_one(filter::by_id(id), None)
            .await?;

        Ok(result.deleted_count > 0)
    }
}
