use bson::doc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;

use super::{Course, NewCourse};
use crate::data::{filter, sequence};
use crate::error::{StoreError, StoreResult};
use crate::middleware::paging::PageState;

pub static COURSE_COLLECTION_NAME: &str = "courses";

/// Course records keyed by id, each with one owning teacher.
#[rocket::async_trait]
pub trait CourseDirectory: Send + Sync {
    async fn create_course(&self, course: NewCourse) -> StoreResult<Course>;

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>>;

    /// `None` both when the course is missing and when `owner` doesn't own it.
    async fn find_owned_course(&self, id: i64, owner: i64) -> StoreResult<Option<Course>>;

    async fn list_courses(&self, page: PageState) -> StoreResult<Vec<Course>>;

    async fn list_courses_by_owner(&self, owner: i64) -> StoreResult<Vec<Course>>;

    async fn list_courses_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Course>>;

    async fn update_course(&self, course: &Course) -> StoreResult<()>;

    async fn delete_course(&self, id: i64) -> StoreResult<bool>;

    async fn count_courses_in_category(&self, category: i64) -> StoreResult<u64>;
}

fn by_id_sorted() -> FindOptions {
    FindOptions::builder().sort(doc! { "_id": 1 }).build()
}

#[rocket::async_trait]
impl CourseDirectory for Database {
    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        let id = sequence::next_id(self, COURSE_COLLECTION_NAME).await?;
        let course = course.into_course(id);

        self.collection::<Course>(COURSE_COLLECTION_NAME)
            .insert_one(&course, None)
            .await?;

        Ok(course)
    }

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn find_owned_course(&self, id: i64, owner: i64) -> StoreResult<Option<Course>> {
        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find_one(doc! { "_id": id, "teacher": owner }, None)
            .await?)
    }

    async fn list_courses(&self, page: PageState) -> StoreResult<Vec<Course>> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(page.skip())
            .limit(page.limit())
            .build();

        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn list_courses_by_owner(&self, owner: i64) -> StoreResult<Vec<Course>> {
        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(doc! { "teacher": owner }, by_id_sorted())
            .await?
            .try_collect()
            .await?)
    }

    async fn list_courses_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Course>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(filter::by_ids(ids), by_id_sorted())
            .await?
            .try_collect()
            .await?)
    }

    async fn update_course(&self, course: &Course) -> StoreResult<()> {
        let result = self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .replace_one(filter::by_id(course.id), course, None)
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::Vanished {
                entity: "course",
                key: course.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_course(&self, id: i64) -> StoreResult<bool> {
        let result = self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .delete_one(filter::by_id(id), None)
            .await?;

        Ok(result.deleted_count > 0)
    }

    async fn count_courses_in_category(&self, category: i64) -> StoreResult<u64> {
        Ok(self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .count_documents(doc! { "category": category }, None)
            .await?)
    }
}
