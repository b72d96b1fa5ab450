//! Storage ports and their MongoDB adapter.
//!
//! Each port is a trait implemented for [`mongodb::Database`]; route handlers
//! only ever see the combined [`Store`] behind a [`Db`] handle so tests can
//! swap in the in-memory adapter.

use std::sync::Arc;

use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::error::StoreResult;

pub mod account;
pub mod announcement;
pub mod bookmark;
pub mod category;
pub mod content;
pub mod course;
pub mod filter;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod membership;
pub mod sequence;

pub use account::db::IdentityStore;
pub use announcement::AnnouncementStore;
pub use bookmark::BookmarkStore;
pub use category::CategoryStore;
pub use content::ContentStore;
pub use course::db::CourseDirectory;
pub use membership::db::MembershipStore;

/// Every storage port the API needs.
pub trait Store:
    IdentityStore
    + CourseDirectory
    + MembershipStore
    + CategoryStore
    + ContentStore
    + AnnouncementStore
    + BookmarkStore
{
}

impl<T> Store for T where
    T: IdentityStore
        + CourseDirectory
        + MembershipStore
        + CategoryStore
        + ContentStore
        + AnnouncementStore
        + BookmarkStore
{
}

pub type Db = Arc<dyn Store>;

const DUPLICATE_KEY: i32 = 11000;

pub(crate) fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn unique_index(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Creates the unique indexes the conflict-tolerant inserts rely on.
pub async fn ensure_indexes(db: &Database) -> StoreResult<()> {
    tracing::info!("Ensuring MongoDB indexes...");

    db.collection::<bson::Document>(account::db::ACCOUNT_COLLECTION_NAME)
        .create_index(unique_index(doc! { "username": 1 }), None)
        .await?;
    db.collection::<bson::Document>(membership::db::MEMBERSHIP_COLLECTION_NAME)
        .create_index(unique_index(doc! { "course_id": 1, "user_id": 1 }), None)
        .await?;
    db.collection::<bson::Document>(bookmark::BOOKMARK_COLLECTION_NAME)
        .create_index(unique_index(doc! { "student": 1, "content": 1 }), None)
        .await?;
    db.collection::<bson::Document>(category::CATEGORY_COLLECTION_NAME)
        .create_index(unique_index(doc! { "name": 1 }), None)
        .await?;

    Ok(())
}
