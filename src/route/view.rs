//! Response shapes shared by several endpoints.
//!
//! Stored documents use `_id` keys and bare foreign ids; the API nests the
//! referenced course and category the way clients expect them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::account::Account;
use crate::data::category::Category;
use crate::data::content::CourseContent;
use crate::data::course::Course;
use crate::data::Store;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl ToString) -> MessageResponse {
        MessageResponse {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
}

impl From<Category> for CategoryView {
    fn from(value: Category) -> Self {
        CategoryView {
            id: value.id,
            name: value.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub teacher: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<CategoryView>,
}

impl CourseView {
    fn new(course: Course, categories: &HashMap<i64, Category>) -> CourseView {
        CourseView {
            category: course
                .category
                .and_then(|id| categories.get(&id))
                .cloned()
                .map(CategoryView::from),
            id: course.id,
            name: course.name,
            description: course.description,
            price: course.price,
            teacher: course.teacher,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

pub async fn course_views(db: &dyn Store, courses: Vec<Course>) -> Result<Vec<CourseView>, Problem> {
    if courses.is_empty() {
        return Ok(vec![]);
    }

    let categories: HashMap<i64, Category> = db
        .list_categories()
        .await?
        .into_iter()
        .map(|it| (it.id, it))
        .collect();

    Ok(courses
        .into_iter()
        .map(|course| CourseView::new(course, &categories))
        .collect())
}

pub async fn course_view(db: &dyn Store, course: Course) -> Result<CourseView, Problem> {
    course_views(db, vec![course])
        .await?
        .pop()
        .ok_or_else(|| problems::internal("course view went missing"))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContentView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub video_url: Option<String>,
    /// `None` only if the course was deleted underneath the content.
    pub course: Option<CourseView>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn content_views(
    db: &dyn Store,
    contents: Vec<CourseContent>,
) -> Result<Vec<ContentView>, Problem> {
    let mut course_ids: Vec<i64> = contents.iter().map(|it| it.course_id).collect();
    course_ids.sort_unstable();
    course_ids.dedup();

    let courses = db.list_courses_by_ids(&course_ids).await?;
    let courses: HashMap<i64, CourseView> = course_views(db, courses)
        .await?
        .into_iter()
        .map(|it| (it.id, it))
        .collect();

    Ok(contents
        .into_iter()
        .map(|content| ContentView {
            course: courses.get(&content.course_id).cloned(),
            id: content.id,
            name: content.name,
            description: content.description,
            video_url: content.video_url,
            parent_id: content.parent_id,
            created_at: content.created_at,
            updated_at: content.updated_at,
        })
        .collect())
}

/// Public part of an account, as listed to other users.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserListItem {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Option<Role>,
}

impl From<Account> for UserListItem {
    fn from(value: Account) -> Self {
        UserListItem {
            role: value.role(),
            id: value.id,
            username: value.username,
            email: value.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<Role>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
}

impl From<Account> for AccountView {
    fn from(value: Account) -> Self {
        let role = value.role();
        let profile = value.profile.unwrap_or_default();
        AccountView {
            id: value.id,
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            role,
            phone_number: profile.phone_number,
            description: profile.description,
        }
    }
}
