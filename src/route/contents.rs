use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::content::NewContent;
use crate::data::Db;
use crate::middleware::paging::PageState;
use crate::resp::auth::Principal;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::courses::problem::course_not_found;
use crate::route::view::{content_views, ContentView};

#[derive(Debug, Serialize, ToSchema)]
pub struct ContentListResponse {
    pub message: String,
    pub data: Vec<ContentView>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContentCreate {
    pub name: String,
    /// Stored as `-` when left out.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    /// Another content of the same course.
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContentResponse {
    pub message: String,
    pub content: ContentView,
}

/// List course contents with their course
#[utoipa::path(
    params(
        ("len" = Option<u32>, Query, description = "page length, at most 100"),
        ("page" = Option<u32>, Query, description = "zero based page index"),
    ),
    responses(
        (status = 200, description = "One page of contents", body = ContentListResponse),
        (status = 401, description = "Missing or expired token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/contents")]
#[tracing::instrument(skip(db))]
pub async fn content_list(
    _caller: Principal,
    page: PageState,
    db: &State<Db>,
) -> Result<Json<ContentListResponse>, Problem> {
    let contents = db.list_contents(page).await?;

    Ok(Json(ContentListResponse {
        message: "Konten berhasil diambil".to_string(),
        data: content_views(db.inner().as_ref(), contents).await?,
    }))
}

/// Add content to an owned course
#[utoipa::path(
    params(("id", description = "course ID")),
    request_body = ContentCreate,
    responses(
        (status = 201, description = "Content created", body = ContentResponse),
        (status = 400, description = "Invalid payload or parent", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such course owned by caller", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/courses/<id>/contents", format = "application/json", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn content_create(
    id: i64,
    caller: Principal,
    create: Json<ContentCreate>,
    db: &State<Db>,
) -> Result<status::Custom<Json<ContentResponse>>, Problem> {
    caller.require(Role::Teacher)?;
    let course = db
        .find_owned_course(id, caller.id())
        .await?
        .ok_or_else(course_not_found)?;

    let create = create.into_inner();
    if create.name.trim().is_empty() {
        return Err(problems::bad_request("Content name is required."));
    }
    if let Some(parent) = create.parent_id {
        match db.get_content(parent).await? {
            Some(it) if it.course_id == course.id => {}
            _ => {
                return Err(problems::bad_request(format!(
                    "Content {} isn't part of this course.",
                    parent
                )))
            }
        }
    }

    let content = db
        .create_content(NewContent {
            name: create.name,
            description: create.description,
            video_url: create.video_url,
            course_id: course.id,
            parent_id: create.parent_id,
        })
        .await?;

    let view = content_views(db.inner().as_ref(), vec![content])
        .await?
        .pop()
        .ok_or_else(|| problems::internal("content view went missing"))?;

    Ok(status::Custom(
        Status::Created,
        Json(ContentResponse {
            message: "Konten berhasil ditambahkan".to_string(),
            content: view,
        }),
    ))
}

#[cfg(test)]
mod content_endpoints {
    use std::sync::Arc;

    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    use crate::data::memory::MemoryStore;
    use crate::role::Role;
    use crate::test_support::{self, bearer, seed_account, seed_course};

    #[rocket::async_test]
    async fn v1_content_create_and_list() {
        let store = Arc::new(MemoryStore::new());
        let owner = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let other = seed_account(&*store, "tom", Some(Role::Teacher)).await;
        let course = seed_course(&*store, &owner, "Algebra").await;
        let client = test_support::client(store).await;
        let uri = format!("/api/v1/courses/{}/contents", course.id);

        let response = client
            .post(uri.clone())
            .header(ContentType::JSON)
            .header(bearer(&other))
            .body(json!({"name": "Intro"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .post(uri.clone())
            .header(ContentType::JSON)
            .header(bearer(&owner))
            .body(json!({"name": "Intro", "video_url": "https://example.com/v"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let created: Value = response.into_json().await.unwrap();
        let intro = created["content"]["id"].as_i64().unwrap();
        assert_eq!(created["content"]["description"], "-");

        let response = client
            .post(uri.clone())
            .header(ContentType::JSON)
            .header(bearer(&owner))
            .body(json!({"name": "Part 2", "parent_id": intro}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let response = client
            .post(uri)
            .header(ContentType::JSON)
            .header(bearer(&owner))
            .body(json!({"name": "Orphan", "parent_id": 404}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .get("/api/v1/contents")
            .header(bearer(&other))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Value = response.into_json().await.unwrap();
        assert_eq!(listed["message"], "Konten berhasil diambil");
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(listed["data"][1]["parent_id"], intro);
        assert_eq!(listed["data"][0]["course"]["name"], "Algebra");
    }
}
