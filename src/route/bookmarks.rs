use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::bookmark::Bookmark;
use crate::data::{Db, Store};
use crate::resp::auth::Principal;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::view::{content_views, ContentView, CourseView, MessageResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarkView {
    pub id: i64,
    pub student: i64,
    pub content: ContentView,
    pub course: Option<CourseView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarkListResponse {
    pub message: String,
    pub data: Vec<BookmarkView>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookmarkCreate {
    pub content_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarkResponse {
    pub message: String,
    pub bookmark: BookmarkView,
}

/// Bookmarks whose content has since disappeared are left out.
async fn bookmark_views(
    db: &dyn Store,
    bookmarks: Vec<Bookmark>,
) -> Result<Vec<BookmarkView>, Problem> {
    let mut contents = Vec::with_capacity(bookmarks.len());
    for bookmark in &bookmarks {
        if let Some(content) = db.get_content(bookmark.content).await? {
            contents.push(content);
        }
    }
    let contents = content_views(db, contents).await?;

    Ok(bookmarks
        .into_iter()
        .filter_map(|bookmark| {
            let content = contents.iter().find(|it| it.id == bookmark.content)?.clone();
            Some(BookmarkView {
                id: bookmark.id,
                student: bookmark.student,
                course: content.course.clone(),
                content,
                created_at: bookmark.created_at,
            })
        })
        .collect())
}

/// Bookmarks of the calling student
#[utoipa::path(
    responses(
        (status = 200, description = "Caller bookmarks", body = BookmarkListResponse),
        (status = 403, description = "Caller isn't a student", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/bookmarks")]
#[tracing::instrument(skip(db))]
pub async fn bookmark_list(
    caller: Principal,
    db: &State<Db>,
) -> Result<Json<BookmarkListResponse>, Problem> {
    caller.require(Role::Student)?;
    let bookmarks = db.list_bookmarks(caller.id()).await?;

    Ok(Json(BookmarkListResponse {
        message: "Get bookmarks success".to_string(),
        data: bookmark_views(db.inner().as_ref(), bookmarks).await?,
    }))
}

/// Bookmark a content
#[utoipa::path(
    request_body = BookmarkCreate,
    responses(
        (status = 201, description = "Bookmark created", body = BookmarkResponse),
        (status = 400, description = "Already bookmarked", body = Problem),
        (status = 403, description = "Caller isn't a student", body = Problem),
        (status = 404, description = "Content doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/bookmarks", format = "application/json", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn bookmark_create(
    caller: Principal,
    create: Json<BookmarkCreate>,
    db: &State<Db>,
) -> Result<status::Custom<Json<BookmarkResponse>>, Problem> {
    caller.require(Role::Student)?;

    if db.get_content(create.content_id).await?.is_none() {
        return Err(problems::not_found("Content"));
    }

    let bookmark = db
        .create_bookmark(caller.id(), create.content_id)
        .await?
        .ok_or_else(|| problems::bad_request("Bookmark already exists"))?;

    let view = bookmark_views(db.inner().as_ref(), vec![bookmark])
        .await?
        .pop()
        .ok_or_else(|| problems::not_found("Content"))?;

    Ok(status::Custom(
        Status::Created,
        Json(BookmarkResponse {
            message: "Bookmark added successfully".to_string(),
            bookmark: view,
        }),
    ))
}

/// Delete one of the caller's bookmarks
#[utoipa::path(
    params(("id", description = "bookmark ID")),
    responses(
        (status = 200, description = "Bookmark deleted", body = MessageResponse),
        (status = 403, description = "Caller isn't a student", body = Problem),
        (status = 404, description = "No such bookmark of the caller", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/bookmarks/<id>")]
#[tracing::instrument(skip(db))]
pub async fn bookmark_delete(
    id: i64,
    caller: Principal,
    db: &State<Db>,
) -> Result<Json<MessageResponse>, Problem> {
    caller.require(Role::Student)?;

    if !db.delete_bookmark(id, caller.id()).await? {
        return Err(problems::not_found("Bookmark"));
    }

    Ok(Json(MessageResponse::new("Bookmark deleted successfully")))
}

#[cfg(test)]
mod bookmark_endpoints {
    use std::sync::Arc;

    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    use crate::data::account::Account;
    use crate::data::content::NewContent;
    use crate::data::memory::MemoryStore;
    use crate::data::ContentStore;
    use crate::role::Role;
    use crate::test_support::{self, bearer, seed_account, seed_course};

    #[rocket::async_test]
    async fn v1_bookmarks_belong_to_students() {
        let store = Arc::new(MemoryStore::new());
        let tina = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let sam = seed_account(&*store, "sam", Some(Role::Student)).await;
        let kim = seed_account(&*store, "kim", Some(Role::Student)).await;
        let course = seed_course(&*store, &tina, "Algebra").await;
        let content = store
            .create_content(NewContent {
                name: "Intro".to_string(),
                description: Some("Start here".to_string()),
                video_url: None,
                course_id: course.id,
                parent_id: None,
            })
            .await
            .unwrap();
        let client = test_support::client(store).await;
        let body = json!({"content_id": content.id}).to_string();

        let post = |caller: &Account| {
            client
                .post("/api/v1/bookmarks")
                .header(ContentType::JSON)
                .header(bearer(caller))
                .body(body.clone())
        };

        assert_eq!(post(&tina).dispatch().await.status(), Status::Forbidden);
        let response = post(&sam).dispatch().await;
        assert_eq!(response.status(), Status::Created);
        let created: Value = response.into_json().await.unwrap();
        let id = created["bookmark"]["id"].as_i64().unwrap();
        assert_eq!(created["bookmark"]["course"]["name"], "Algebra");
        assert_eq!(post(&sam).dispatch().await.status(), Status::BadRequest);

        let response = client
            .post("/api/v1/bookmarks")
            .header(ContentType::JSON)
            .header(bearer(&sam))
            .body(json!({"content_id": 404}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .get("/api/v1/bookmarks")
            .header(bearer(&sam))
            .dispatch()
            .await;
        let listed: Value = response.into_json().await.unwrap();
        assert_eq!(listed["data"][0]["content"]["name"], "Intro");

        let uri = format!("/api/v1/bookmarks/{}", id);
        let response = client.delete(uri.clone()).header(bearer(&kim)).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let response = client.delete(uri).header(bearer(&sam)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }
}
