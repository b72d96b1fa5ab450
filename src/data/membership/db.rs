use bson::doc;
use mongodb::options::{FindOptions, UpdateOptions};
use mongodb::Database;
use rocket::futures::TryStreamExt;

use super::{Enrollment, Membership};
use crate::data::{filter, is_duplicate_key};
use crate::error::{StoreError, StoreResult};
use crate::role::CourseRole;

pub static MEMBERSHIP_COLLECTION_NAME: &str = "memberships";

/// Course memberships. At most one per (course, user) pair.
#[rocket::async_trait]
pub trait MembershipStore: Send + Sync {
    /// Returns the existing membership untouched, or inserts a new one with
    /// `role`. Concurrent callers for the same pair observe exactly one
    /// `created == true`.
    async fn get_or_create_membership(
        &self,
        course_id: i64,
        user_id: i64,
        role: CourseRole,
    ) -> StoreResult<Enrollment>;

    async fn list_memberships_of_user(&self, user_id: i64) -> StoreResult<Vec<Membership>>;

    async fn count_members(&self, course_id: i64) -> StoreResult<u64>;
}

#[rocket::async_trait]
impl MembershipStore for Database {
    async fn get_or_create_membership(
        &self,
        course_id: i64,
        user_id: i64,
        role: CourseRole,
    ) -> StoreResult<Enrollment> {
        let collection = self.collection::<Membership>(MEMBERSHIP_COLLECTION_NAME);
        let fresh = Membership::new(course_id, user_id, role);
        let now = bson::DateTime::from_chrono(fresh.created_at);

        let insert = doc! {
            "$setOnInsert": {
                "role": bson::to_bson(&role)?,
                "created_at": now,
                "updated_at": now,
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();

        let created = match collection
            .update_one(filter::membership(course_id, user_id), insert, options)
            .await
        {
            Ok(result) => result.upserted_id.is_some(),
            // Lost an upsert race against the unique index.
            Err(e) if is_duplicate_key(&e) => false,
            Err(e) => return Err(e.into()),
        };

        if created {
            return Ok(Enrollment {
                membership: fresh,
                created,
            });
        }

        let membership = collection
            .find_one(filter::membership(course_id, user_id), None)
            .await?
            .ok_or_else(|| StoreError::Vanished {
                entity: "membership",
                key: format!("{}:{}", course_id, user_id),
            })?;

        Ok(Enrollment {
            membership,
            created,
        })
    }

    async fn list_memberships_of_user(&self, user_id: i64) -> StoreResult<Vec<Membership>> {
        let options = FindOptions::builder()
            .sort(doc! { "course_id": 1 })
            .build();

        Ok(self
            .collection::<Membership>(MEMBERSHIP_COLLECTION_NAME)
            .find(doc! { "user_id": user_id }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn count_members(&self, course_id: i64) -> StoreResult<u64> {
        Ok(self
            .collection::<Membership>(MEMBERSHIP_COLLECTION_NAME)
            .count_documents(doc! { "course_id": course_id }, None)
            .await?)
    }
}
