use chrono::Utc;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::course::{Course, NewCourse};
use crate::data::{Db, Store};
use crate::enroll;
use crate::middleware::paging::PageState;
use crate::resp::auth::Principal;
use crate::resp::problem::{problems, Problem};
use crate::role::{CourseRole, Role};
use crate::route::view::{course_view, course_views, CourseView, MessageResponse};

pub mod problem {
    use crate::resp::problem::{problems, Problem};

    pub fn course_not_found() -> Problem {
        problems::not_found("Course")
    }

    pub fn unknown_category(id: i64) -> Problem {
        problems::bad_request(format!("Category {} doesn't exist.", id))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CourseCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub category: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    pub message: String,
    pub course: CourseView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MembershipView {
    pub course_id: i64,
    pub user_id: i64,
    pub role: CourseRole,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollResponse {
    pub message: String,
    pub membership: MembershipView,
}

fn check_name(name: &str) -> Result<(), Problem> {
    if name.trim().is_empty() {
        return Err(problems::bad_request("Course name is required."));
    }
    Ok(())
}

fn check_price(price: i64) -> Result<(), Problem> {
    if price < 0 {
        return Err(problems::bad_request("Price can't be negative."));
    }
    Ok(())
}

async fn check_category(db: &dyn Store, category: Option<i64>) -> Result<(), Problem> {
    if let Some(id) = category {
        if db.get_category(id).await?.is_none() {
            return Err(problem::unknown_category(id));
        }
    }
    Ok(())
}

/// Owned course or 404; foreign courses aren't disclosed.
async fn owned_course(db: &dyn Store, caller: &Principal, id: i64) -> Result<Course, Problem> {
    caller.require(Role::Teacher)?;
    db.find_owned_course(id, caller.id())
        .await?
        .ok_or_else(problem::course_not_found)
}

/// List courses with their category
#[utoipa::path(
    params(
        ("len" = Option<u32>, Query, description = "page length, at most 100"),
        ("page" = Option<u32>, Query, description = "zero based page index"),
    ),
    responses(
        (status = 200, description = "One page of courses", body = Vec<CourseView>),
        (status = 401, description = "Missing or expired token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/courses")]
#[tracing::instrument(skip(db))]
pub async fn course_list(
    _caller: Principal,
    page: PageState,
    db: &State<Db>,
) -> Result<Json<Vec<CourseView>>, Problem> {
    let courses = db.list_courses(page).await?;
    Ok(Json(course_views(db.inner().as_ref(), courses).await?))
}

/// Create a course owned by the calling teacher
#[utoipa::path(
    request_body = CourseCreate,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Invalid payload or missing profile", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/courses", format = "application/json", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn course_create(
    caller: Principal,
    create: Json<CourseCreate>,
    db: &State<Db>,
) -> Result<status::Custom<Json<CourseResponse>>, Problem> {
    caller.require(Role::Teacher)?;
    let create = create.into_inner();
    check_name(&create.name)?;
    check_price(create.price)?;
    check_category(db.inner().as_ref(), create.category).await?;

    let course = db
        .create_course(NewCourse {
            name: create.name,
            description: create.description,
            price: create.price,
            teacher: caller.id(),
            category: create.category,
        })
        .await?;
    tracing::info!("'{}' created course {}", caller.account.username, course.id);

    Ok(status::Custom(
        Status::Created,
        Json(CourseResponse {
            message: "Data berhasil ditambahkan".to_string(),
            course: course_view(db.inner().as_ref(), course).await?,
        }),
    ))
}

/// Update fields of an owned course
#[utoipa::path(
    params(("id", description = "course ID")),
    request_body = CourseUpdate,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such course owned by caller", body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/courses/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn course_update(
    id: i64,
    caller: Principal,
    update: Json<CourseUpdate>,
    db: &State<Db>,
) -> Result<Json<CourseResponse>, Problem> {
    let store = db.inner().as_ref();
    let mut course = owned_course(store, &caller, id).await?;
    let update = update.into_inner();

    if let Some(name) = update.name {
        check_name(&name)?;
        course.name = name;
    }
    if let Some(description) = update.description {
        course.description = description;
    }
    if let Some(price) = update.price {
        check_price(price)?;
        course.price = price;
    }
    if update.category.is_some() {
        check_category(store, update.category).await?;
        course.category = update.category;
    }
    course.updated_at = Utc::now();

    db.update_course(&course).await?;

    Ok(Json(CourseResponse {
        message: "Data berhasil diubah".to_string(),
        course: course_view(store, course).await?,
    }))
}

/// Delete an owned course that has no members and no contents
#[utoipa::path(
    params(("id", description = "course ID")),
    responses(
        (status = 200, description = "Course deleted", body = MessageResponse),
        (status = 400, description = "Course still has members or contents", body = Problem),
        (status = 404, description = "No such course owned by caller", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/courses/<id>")]
#[tracing::instrument(skip(db))]
pub async fn course_delete(
    id: i64,
    caller: Principal,
    db: &State<Db>,
) -> Result<Json<MessageResponse>, Problem> {
    let store = db.inner().as_ref();
    let course = owned_course(store, &caller, id).await?;

    if db.count_members(course.id).await? > 0 {
        return Err(problems::bad_request(
            "Course still has enrolled members.",
        ));
    }
    if db.count_contents(course.id).await? > 0 {
        return Err(problems::bad_request("Course still has contents."));
    }

    if !db.delete_course(course.id).await? {
        return Err(problem::course_not_found());
    }
    tracing::info!("'{}' deleted course {}", caller.account.username, course.id);

    Ok(Json(MessageResponse::new("Data berhasil dihapus")))
}

/// Enroll the calling student into a course
#[utoipa::path(
    params(("id", description = "course ID")),
    responses(
        (status = 201, description = "Newly enrolled", body = EnrollResponse),
        (status = 200, description = "Already enrolled", body = EnrollResponse),
        (status = 403, description = "Caller isn't a student", body = Problem),
        (status = 404, description = "Course doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/courses/<id>/enroll")]
#[tracing::instrument(skip(db))]
pub async fn course_enroll(
    id: i64,
    caller: Principal,
    db: &State<Db>,
) -> Result<status::Custom<Json<EnrollResponse>>, Problem> {
    let enrollment = enroll::self_enroll(db.inner().as_ref(), &caller.account, id).await?;

    let (status, message) = match enrollment.created {
        true => (Status::Created, "Berhasil mendaftar ke kursus."),
        false => (Status::Ok, "Anda sudah terdaftar di kursus ini."),
    };

    Ok(status::Custom(
        status,
        Json(EnrollResponse {
            message: message.to_string(),
            membership: MembershipView {
                course_id: enrollment.membership.course_id,
                user_id: enrollment.membership.user_id,
                role: enrollment.membership.role,
            },
        }),
    ))
}

#[cfg(test)]
mod course_endpoints {
    use std::sync::Arc;

    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    use crate::data::content::NewContent;
    use crate::data::memory::MemoryStore;
    use crate::data::{CategoryStore, ContentStore, CourseDirectory};
    use crate::role::Role;
    use crate::test_support::{self, bearer, seed_account, seed_course};

    #[rocket::async_test]
    async fn v1_course_create_requires_teacher() {
        let store = Arc::new(MemoryStore::new());
        let teacher = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let student = seed_account(&*store, "sam", Some(Role::Student)).await;
        let category = store.create_category("Math").await.unwrap();
        let client = test_support::client(store).await;
        let body = json!({"name": "Algebra", "price": 150000, "category": category.id}).to_string();

        let response = client
            .post("/api/v1/courses")
            .header(ContentType::JSON)
            .header(bearer(&student))
            .body(body.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .post("/api/v1/courses")
            .header(ContentType::JSON)
            .header(bearer(&teacher))
            .body(body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["course"]["teacher"], teacher.id);
        assert_eq!(body["course"]["category"]["name"], "Math");
    }

    #[rocket::async_test]
    async fn v1_course_create_rejects_unknown_category() {
        let store = Arc::new(MemoryStore::new());
        let teacher = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let client = test_support::client(store).await;

        let response = client
            .post("/api/v1/courses")
            .header(ContentType::JSON)
            .header(bearer(&teacher))
            .body(json!({"name": "Algebra", "price": 1, "category": 42}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn v1_course_update_is_owner_only() {
        let store = Arc::new(MemoryStore::new());
        let owner = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let other = seed_account(&*store, "tom", Some(Role::Teacher)).await;
        let course = seed_course(&*store, &owner, "Algebra").await;
        let client = test_support::client(store.clone()).await;
        let uri = format!("/api/v1/courses/{}", course.id);

        let response = client
            .put(uri.clone())
            .header(ContentType::JSON)
            .header(bearer(&other))
            .body(json!({"name": "Stolen"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .put(uri)
            .header(ContentType::JSON)
            .header(bearer(&owner))
            .body(json!({"name": "Linear Algebra", "price": 10}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let stored = store.get_course(course.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Linear Algebra");
        assert_eq!(stored.price, 10);
    }

    #[rocket::async_test]
    async fn v1_course_delete_refuses_courses_in_use() {
        let store = Arc::new(MemoryStore::new());
        let owner = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let student = seed_account(&*store, "sam", Some(Role::Student)).await;
        let busy = seed_course(&*store, &owner, "Algebra").await;
        let with_content = seed_course(&*store, &owner, "Geometry").await;
        let empty = seed_course(&*store, &owner, "Topology").await;
        store
            .create_content(NewContent {
                name: "Intro".to_string(),
                description: None,
                video_url: None,
                course_id: with_content.id,
                parent_id: None,
            })
            .await
            .unwrap();
        let client = test_support::client(store.clone()).await;

        let response = client
            .post(format!("/api/v1/courses/{}/enroll", busy.id))
            .header(bearer(&student))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        for (course, expected) in [
            (busy.id, Status::BadRequest),
            (with_content.id, Status::BadRequest),
            (empty.id, Status::Ok),
        ] {
            let response = client
                .delete(format!("/api/v1/courses/{}", course))
                .header(bearer(&owner))
                .dispatch()
                .await;
            assert_eq!(response.status(), expected, "deleting course {}", course);
        }

        assert!(store.get_course(empty.id).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn v1_course_enroll_reports_existing_membership() {
        let store = Arc::new(MemoryStore::new());
        let owner = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let student = seed_account(&*store, "sam", Some(Role::Student)).await;
        let course = seed_course(&*store, &owner, "Algebra").await;
        let client = test_support::client(store.clone()).await;
        let uri = format!("/api/v1/courses/{}/enroll", course.id);

        let first = client.post(uri.clone()).header(bearer(&student)).dispatch().await;
        assert_eq!(first.status(), Status::Created);
        let again = client.post(uri.clone()).header(bearer(&student)).dispatch().await;
        assert_eq!(again.status(), Status::Ok);
        let teacher = client.post(uri).header(bearer(&owner)).dispatch().await;
        assert_eq!(teacher.status(), Status::Forbidden);
        let missing = client
            .post("/api/v1/courses/999/enroll")
            .header(bearer(&student))
            .dispatch()
            .await;
        assert_eq!(missing.status(), Status::NotFound);

        assert_eq!(store.membership_count(course.id), 1);
    }
}
