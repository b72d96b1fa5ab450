use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::announcement::{Announcement, NewAnnouncement};
use crate::data::{Db, Store};
use crate::resp::auth::Principal;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::courses::problem::course_not_found;
use crate::route::view::{course_view, CourseView, MessageResponse};

pub mod problem {
    use crate::resp::problem::{problems, Problem};

    pub fn announcement_not_found() -> Problem {
        problems::not_found("Announcement")
    }

    pub fn not_author(action: &str) -> Problem {
        problems::forbidden(format!("You are not allowed to {} this announcement", action))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementView {
    pub id: i64,
    pub course: CourseView,
    /// Author username.
    pub teacher: String,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnnouncementCreate {
    pub title: String,
    pub content: String,
    /// Defaults to now.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementResponse {
    pub message: String,
    pub announcement: AnnouncementView,
}

async fn announcement_views(
    db: &dyn Store,
    course: CourseView,
    announcements: Vec<Announcement>,
) -> Result<Vec<AnnouncementView>, Problem> {
    let mut authors: HashMap<i64, String> = HashMap::new();
    let mut result = Vec::with_capacity(announcements.len());

    for announcement in announcements {
        let teacher = match authors.get(&announcement.teacher) {
            Some(name) => name.clone(),
            None => {
                let name = db
                    .get_account(announcement.teacher)
                    .await?
                    .map(|it| it.username)
                    .unwrap_or_default();
                authors.insert(announcement.teacher, name.clone());
                name
            }
        };

        result.push(AnnouncementView {
            id: announcement.id,
            course: course.clone(),
            teacher,
            title: announcement.title,
            content: announcement.content,
            date: announcement.date,
            created_at: announcement.created_at,
            updated_at: announcement.updated_at,
        });
    }

    Ok(result)
}

/// Loads an announcement the caller wrote; `action` names the attempt in the 403.
async fn authored(
    db: &dyn Store,
    caller: &Principal,
    id: i64,
    action: &str,
) -> Result<Announcement, Problem> {
    caller.require(Role::Teacher)?;
    let announcement = db
        .get_announcement(id)
        .await?
        .ok_or_else(problem::announcement_not_found)?;
    if announcement.teacher != caller.id() {
        return Err(problem::not_author(action));
    }
    Ok(announcement)
}

/// List announcements of a course
#[utoipa::path(
    params(("id", description = "course ID")),
    responses(
        (status = 200, description = "Announcements of the course", body = Vec<AnnouncementView>),
        (status = 404, description = "Course doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/courses/<id>/announcements")]
#[tracing::instrument(skip(db))]
pub async fn announcement_list(
    id: i64,
    _caller: Principal,
    db: &State<Db>,
) -> Result<Json<Vec<AnnouncementView>>, Problem> {
    let store = db.inner().as_ref();
    let course = db.get_course(id).await?.ok_or_else(course_not_found)?;
    let announcements = db.list_announcements(course.id).await?;
    let course = course_view(store, course).await?;

    Ok(Json(announcement_views(store, course, announcements).await?))
}

/// Post an announcement in an owned course
#[utoipa::path(
    params(("id", description = "course ID")),
    request_body = AnnouncementCreate,
    responses(
        (status = 201, description = "Announcement created", body = AnnouncementResponse),
        (status = 403, description = "Caller isn't a teacher or doesn't own the course", body = Problem),
        (status = 404, description = "Course doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/courses/<id>/announcements", format = "application/json", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn announcement_create(
    id: i64,
    caller: Principal,
    create: Json<AnnouncementCreate>,
    db: &State<Db>,
) -> Result<status::Custom<Json<AnnouncementResponse>>, Problem> {
    caller.require(Role::Teacher)?;
    let store = db.inner().as_ref();
    let course = db.get_course(id).await?.ok_or_else(course_not_found)?;
    if !course.is_owned_by(caller.id()) {
        return Err(problems::forbidden(
            "You are not allowed to post announcements in this course",
        ));
    }

    let create = create.into_inner();
    if create.title.trim().is_empty() {
        return Err(problems::bad_request("Announcement title is required."));
    }

    let announcement = db
        .create_announcement(NewAnnouncement {
            course: course.id,
            teacher: caller.id(),
            title: create.title,
            content: create.content,
            date: create.date.unwrap_or_else(Utc::now),
        })
        .await?;

    let course = course_view(store, course).await?;
    let view = announcement_views(store, course, vec![announcement])
        .await?
        .pop()
        .ok_or_else(|| problems::internal("announcement view went missing"))?;

    Ok(status::Custom(
        Status::Created,
        Json(AnnouncementResponse {
            message: "Announcement created successfully".to_string(),
            announcement: view,
        }),
    ))
}

/// Update an announcement written by the caller
#[utoipa::path(
    params(("id", description = "announcement ID")),
    request_body = AnnouncementUpdate,
    responses(
        (status = 200, description = "Announcement updated", body = MessageResponse),
        (status = 403, description = "Caller isn't the author", body = Problem),
        (status = 404, description = "Announcement doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/announcements/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn announcement_update(
    id: i64,
    caller: Principal,
    update: Json<AnnouncementUpdate>,
    db: &State<Db>,
) -> Result<Json<MessageResponse>, Problem> {
    let mut announcement = authored(db.inner().as_ref(), &caller, id, "edit").await?;
    let update = update.into_inner();

    if let Some(title) = update.title {
        announcement.title = title;
    }
    if let Some(content) = update.content {
        announcement.content = content;
    }
    if let Some(date) = update.date {
        announcement.date = date;
    }
    announcement.updated_at = Utc::now();

    db.update_announcement(&announcement).await?;

    Ok(Json(MessageResponse::new("Announcement updated successfully")))
}

/// Delete an announcement written by the caller
#[utoipa::path(
    params(("id", description = "announcement ID")),
    responses(
        (status = 200, description = "Announcement deleted", body = MessageResponse),
        (status = 403, description = "Caller isn't the author", body = Problem),
        (status = 404, description = "Announcement doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/announcements/<id>")]
#[tracing::instrument(skip(db))]
pub async fn announcement_delete(
    id: i64,
    caller: Principal,
    db: &State<Db>,
) -> Result<Json<MessageResponse>, Problem> {
    let announcement = authored(db.inner().as_ref(), &caller, id, "delete").await?;

    if !db.delete_announcement(announcement.id).await? {
        return Err(problem::announcement_not_found());
    }

    Ok(Json(MessageResponse::new("Announcement deleted successfully")))
}

#[cfg(test)]
mod announcement_endpoints {
    use std::sync::Arc;

    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{json, Value};

    use crate::data::account::Account;
    use crate::data::memory::MemoryStore;
    use crate::data::AnnouncementStore;
    use crate::role::Role;
    use crate::test_support::{self, bearer, seed_account, seed_course};

    async fn post_announcement(client: &Client, course: i64, caller: &Account) -> Status {
        client
            .post(format!("/api/v1/courses/{}/announcements", course))
            .header(ContentType::JSON)
            .header(bearer(caller))
            .body(json!({"title": "Quiz", "content": "Friday", "date": "2026-10-23T08:00:00Z"}).to_string())
            .dispatch()
            .await
            .status()
    }

    #[rocket::async_test]
    async fn v1_announcements_are_posted_by_owner_only() {
        let store = Arc::new(MemoryStore::new());
        let owner = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let other = seed_account(&*store, "tom", Some(Role::Teacher)).await;
        let student = seed_account(&*store, "sam", Some(Role::Student)).await;
        let course = seed_course(&*store, &owner, "Algebra").await;
        let client = test_support::client(store).await;

        assert_eq!(post_announcement(&client, course.id, &student).await, Status::Forbidden);
        assert_eq!(post_announcement(&client, course.id, &other).await, Status::Forbidden);
        assert_eq!(post_announcement(&client, 999, &owner).await, Status::NotFound);
        assert_eq!(post_announcement(&client, course.id, &owner).await, Status::Created);

        let response = client
            .get(format!("/api/v1/courses/{}/announcements", course.id))
            .header(bearer(&student))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Value = response.into_json().await.unwrap();
        assert_eq!(listed[0]["teacher"], "tina");
        assert_eq!(listed[0]["course"]["name"], "Algebra");
        assert_eq!(listed[0]["title"], "Quiz");
    }

    #[rocket::async_test]
    async fn v1_announcements_are_edited_by_author_only() {
        let store = Arc::new(MemoryStore::new());
        let owner = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let other = seed_account(&*store, "tom", Some(Role::Teacher)).await;
        let course = seed_course(&*store, &owner, "Algebra").await;
        let client = test_support::client(store.clone()).await;
        assert_eq!(post_announcement(&client, course.id, &owner).await, Status::Created);
        let id = store.list_announcements(course.id).await.unwrap()[0].id;
        let uri = format!("/api/v1/announcements/{}", id);

        let response = client
            .put(uri.clone())
            .header(ContentType::JSON)
            .header(bearer(&other))
            .body(json!({"title": "Hijacked"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .put(uri.clone())
            .header(ContentType::JSON)
            .header(bearer(&owner))
            .body(json!({"title": "Quiz moved"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            store.get_announcement(id).await.unwrap().unwrap().title,
            "Quiz moved"
        );

        let response = client.delete(uri.clone()).header(bearer(&other)).dispatch().await;
        assert_eq!(response.status(), Status::Forbidden);
        let response = client.delete(uri.clone()).header(bearer(&owner)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let response = client.delete(uri).header(bearer(&owner)).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
