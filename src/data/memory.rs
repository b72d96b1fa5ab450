//! In-memory adapter for every storage port.
//!
//! All state sits behind one mutex, so each port call is atomic the same
//! way a single-document MongoDB write is.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::account::{Account, NewAccount};
use super::announcement::{Announcement, AnnouncementStore, NewAnnouncement};
use super::bookmark::{Bookmark, BookmarkStore};
use super::category::{Category, CategoryStore};
use super::content::{ContentStore, CourseContent, NewContent};
use super::course::{Course, NewCourse};
use super::membership::{Enrollment, Membership};
use super::{CourseDirectory, IdentityStore, MembershipStore};
use crate::error::{StoreError, StoreResult};
use crate::middleware::paging::PageState;
use crate::role::CourseRole;

#[derive(Debug, Default)]
struct MemoryState {
    sequences: HashMap<&'static str, i64>,
    accounts: BTreeMap<i64, Account>,
    courses: BTreeMap<i64, Course>,
    memberships: BTreeMap<(i64, i64), Membership>,
    categories: BTreeMap<i64, Category>,
    contents: BTreeMap<i64, CourseContent>,
    announcements: BTreeMap<i64, Announcement>,
    bookmarks: BTreeMap<i64, Bookmark>,
}

impl MemoryState {
    fn next_id(&mut self, collection: &'static str) -> i64 {
        let seq = self.sequences.entry(collection).or_insert(0);
        *seq += 1;
        *seq
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of memberships held for `course_id`, for assertions.
    pub fn membership_count(&self, course_id: i64) -> usize {
        self.state()
            .map(|state| {
                state
                    .memberships
                    .keys()
                    .filter(|(course, _)| *course == course_id)
                    .count()
            })
            .unwrap_or(0)
    }
}

#[rocket::async_trait]
impl IdentityStore for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut state = self.state()?;
        if state
            .accounts
            .values()
            .any(|it| it.username == account.username)
        {
            return Err(StoreError::Conflict {
                entity: "username",
                key: account.username,
            });
        }

        let id = state.next_id("accounts");
        let account = account.into_account(id);
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: i64) -> StoreResult<Option<Account>> {
        Ok(self.state()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .state()?
            .accounts
            .values()
            .find(|it| it.username == username)
            .cloned())
    }

    async fn list_accounts(&self, page: PageState) -> StoreResult<Vec<Account>> {
        Ok(page.apply(self.state()?.accounts.values().cloned()))
    }

    async fn update_account(&self, account: &Account) -> StoreResult<()> {
        match self.state()?.accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(StoreError::Vanished {
                entity: "account",
                key: account.id.to_string(),
            }),
        }
    }
}

#[rocket::async_trait]
impl CourseDirectory for MemoryStore {
    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        let mut state = self.state()?;
        let id = state.next_id("courses");
        let course = course.into_course(id);
        state.courses.insert(id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(self.state()?.courses.get(&id).cloned())
    }

    async fn find_owned_course(&self, id: i64, owner: i64) -> StoreResult<Option<Course>> {
        Ok(self
            .state()?
            .courses
            .get(&id)
            .filter(|it| it.is_owned_by(owner))
            .cloned())
    }

    async fn list_courses(&self, page: PageState) -> StoreResult<Vec<Course>> {
        Ok(page.apply(self.state()?.courses.values().cloned()))
    }

    async fn list_courses_by_owner(&self, owner: i64) -> StoreResult<Vec<Course>> {
        Ok(self
            .state()?
            .courses
            .values()
            .filter(|it| it.is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn list_courses_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Course>> {
        Ok(self
            .state()?
            .courses
            .values()
            .filter(|it| ids.contains(&it.id))
            .cloned()
            .collect())
    }

    async fn update_course(&self, course: &Course) -> StoreResult<()> {
        match self.state()?.courses.get_mut(&course.id) {
            Some(existing) => {
                *existing = course.clone();
                Ok(())
            }
            None => Err(StoreError::Vanished {
                entity: "course",
                key: course.id.to_string(),
            }),
        }
    }

    async fn delete_course(&self, id: i64) -> StoreResult<bool> {
        Ok(self.state()?.courses.remove(&id).is_some())
    }

    async fn count_courses_in_category(&self, category: i64) -> StoreResult<u64> {
        Ok(self
            .state()?
            .courses
            .values()
            .filter(|it| it.category == Some(category))
            .count() as u64)
    }
}

#[rocket::async_trait]
impl MembershipStore for MemoryStore {
    async fn get_or_create_membership(
        &self,
        course_id: i64,
        user_id: i64,
        role: CourseRole,
    ) -> StoreResult<Enrollment> {
        let mut state = self.state()?;

        if let Some(existing) = state.memberships.get(&(course_id, user_id)) {
            return Ok(Enrollment {
                membership: existing.clone(),
                created: false,
            });
        }

        let membership = Membership::new(course_id, user_id, role);
        state
            .memberships
            .insert((course_id, user_id), membership.clone());

        Ok(Enrollment {
            membership,
            created: true,
        })
    }

    async fn list_memberships_of_user(&self, user_id: i64) -> StoreResult<Vec<Membership>> {
        Ok(self
            .state()?
            .memberships
            .values()
            .filter(|it| it.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_members(&self, course_id: i64) -> StoreResult<u64> {
        Ok(self
            .state()?
            .memberships
            .keys()
            .filter(|(course, _)| *course == course_id)
            .count() as u64)
    }
}

#[rocket::async_trait]
impl CategoryStore for MemoryStore {
    async fn create_category(&self, name: &str) -> StoreResult<Category> {
        let mut state = self.state()?;
        if state.categories.values().any(|it| it.name == name) {
            return Err(StoreError::Conflict {
                entity: "category",
                key: name.to_string(),
            });
        }

        let id = state.next_id("categories");
        let category = Category {
            id,
            name: name.to_string(),
        };
        state.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self.state()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.state()?.categories.values().cloned().collect())
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        Ok(self.state()?.categories.remove(&id).is_some())
    }
}

#[rocket::async_trait]
impl ContentStore for MemoryStore {
    async fn create_content(&self, content: NewContent) -> StoreResult<CourseContent> {
        let mut state = self.state()?;
        let id = state.next_id("contents");
        let content = content.into_content(id);
        state.contents.insert(id, content.clone());
        Ok(content)
    }

    async fn get_content(&self, id: i64) -> StoreResult<Option<CourseContent>> {
        Ok(self.state()?.contents.get(&id).cloned())
    }

    async fn list_contents(&self, page: PageState) -> StoreResult<Vec<CourseContent>> {
        Ok(page.apply(self.state()?.contents.values().cloned()))
    }

    async fn count_contents(&self, course_id: i64) -> StoreResult<u64> {
        Ok(self
            .state()?
            .contents
            .values()
            .filter(|it| it.course_id == course_id)
            .count() as u64)
    }
}

#[rocket::async_trait]
impl AnnouncementStore for MemoryStore {
    async fn create_announcement(
        &self,
        announcement: NewAnnouncement,
    ) -> StoreResult<Announcement> {
        let mut state = self.state()?;
        let id = state.next_id("announcements");
        let announcement = announcement.into_announcement(id);
        state.announcements.insert(id, announcement.clone());
        Ok(announcement)
    }

    async fn get_announcement(&self, id: i64) -> StoreResult<Option<Announcement>> {
        Ok(self.state()?.announcements.get(&id).cloned())
    }

    async fn list_announcements(&self, course: i64) -> StoreResult<Vec<Announcement>> {
        Ok(self
            .state()?
            .announcements
            .values()
            .filter(|it| it.course == course)
            .cloned()
            .collect())
    }

    async fn update_announcement(&self, announcement: &Announcement) -> StoreResult<()> {
        match self.state()?.announcements.get_mut(&announcement.id) {
            Some(existing) => {
                *existing = announcement.clone();
                Ok(())
            }
            None => Err(StoreError::Vanished {
                entity: "announcement",
                key: announcement.id.to_string(),
            }),
        }
    }

    async fn delete_announcement(&self, id: i64) -> StoreResult<bool> {
        Ok(self.state()?.announcements.remove(&id).is_some())
    }
}

#[rocket::async_trait]
impl BookmarkStore for MemoryStore {
    async fn create_bookmark(&self, student: i64, content: i64) -> StoreResult<Option<Bookmark>> {
        let mut state = self.state()?;
        if state
            .bookmarks
            .values()
            .any(|it| it.student == student && it.content == content)
        {
            return Ok(None);
        }

        let id = state.next_id("bookmarks");
        let bookmark = Bookmark {
            id,
            student,
            content,
            created_at: Utc::now(),
        };
        state.bookmarks.insert(id, bookmark.clone());
        Ok(Some(bookmark))
    }

    async fn list_bookmarks(&self, student: i64) -> StoreResult<Vec<Bookmark>> {
        Ok(self
            .state()?
            .bookmarks
            .values()
            .filter(|it| it.student == student)
            .cloned()
            .collect())
    }

    async fn delete_bookmark(&self, id: i64, student: i64) -> StoreResult<bool> {
        let mut state = self.state()?;
        let owned = state
            .bookmarks
            .get(&id)
            .map(|it| it.student == student)
            .unwrap_or(false);

        if owned {
            state.bookmarks.remove(&id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn get_or_create_is_idempotent() {
        let store = MemoryStore::new();

        let first = store
            .get_or_create_membership(1, 7, CourseRole::Student)
            .await
            .unwrap();
        let second = store
            .get_or_create_membership(1, 7, CourseRole::Assistant)
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.membership.role, CourseRole::Student);
        assert_eq!(store.membership_count(1), 1);
        assert_eq!(store.membership_count(2), 0);
    }

    #[rocket::async_test]
    async fn bookmarks_are_unique_per_student_and_content() {
        let store = MemoryStore::new();

        assert!(store.create_bookmark(5, 9).await.unwrap().is_some());
        assert!(store.create_bookmark(5, 9).await.unwrap().is_none());
        assert!(store.create_bookmark(6, 9).await.unwrap().is_some());

        let mine = store.list_bookmarks(5).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(!store.delete_bookmark(mine[0].id, 6).await.unwrap());
        assert!(store.delete_bookmark(mine[0].id, 5).await.unwrap());
    }

    #[rocket::async_test]
    async fn category_names_are_unique() {
        let store = MemoryStore::new();

        store.create_category("Science").await.unwrap();
        match store.create_category("Science").await {
            Err(StoreError::Conflict { entity, .. }) => assert_eq!(entity, "category"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }
}
