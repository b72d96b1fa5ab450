use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::account::Account;
use crate::data::{Db, Store};
use crate::resp::auth::Principal;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::view::{course_views, CourseView};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Always empty for teachers.
    pub courses_joined: Vec<CourseView>,
    pub courses_created: Vec<CourseView>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileUpdateResponse {
    pub message: String,
    pub user: ProfileView,
}

async fn profile_view(db: &dyn Store, account: Account) -> Result<ProfileView, Problem> {
    let courses_joined = match account.role() {
        Some(Role::Teacher) => vec![],
        _ => {
            let ids: Vec<i64> = db
                .list_memberships_of_user(account.id)
                .await?
                .into_iter()
                .map(|it| it.course_id)
                .collect();
            let courses = db.list_courses_by_ids(&ids).await?;
            course_views(db, courses).await?
        }
    };

    let created = db.list_courses_by_owner(account.id).await?;
    let courses_created = course_views(db, created).await?;

    let role = account.role();
    let profile = account.profile.unwrap_or_default();

    Ok(ProfileView {
        id: account.id,
        username: account.username,
        first_name: account.first_name,
        last_name: account.last_name,
        email: account.email,
        courses_joined,
        courses_created,
        phone_number: profile.phone_number,
        description: profile.description,
        role,
    })
}

/// Profile of the caller with the courses they joined and created
#[utoipa::path(
    responses(
        (status = 200, description = "Caller profile", body = ProfileView),
        (status = 401, description = "Missing or expired token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/profile")]
#[tracing::instrument(skip(db))]
pub async fn profile_get(caller: Principal, db: &State<Db>) -> Result<Json<ProfileView>, Problem> {
    Ok(Json(profile_view(db.inner().as_ref(), caller.account).await?))
}

/// Update names, email and profile details of the caller
///
/// Callers without a profile get a default student profile first.
#[utoipa::path(
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = ProfileUpdateResponse),
        (status = 400, description = "Invalid email", body = Problem),
        (status = 401, description = "Missing or expired token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/profile", format = "application/json", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn profile_update(
    caller: Principal,
    update: Json<ProfileUpdate>,
    db: &State<Db>,
) -> Result<Json<ProfileUpdateResponse>, Problem> {
    let update = update.into_inner();
    let mut account = caller.account;

    if let Some(email) = update.email {
        if !email.is_empty() && !email.contains('@') {
            return Err(problems::bad_request("Enter a valid email address."));
        }
        account.email = email;
    }
    if let Some(first_name) = update.first_name {
        account.first_name = first_name;
    }
    if let Some(last_name) = update.last_name {
        account.last_name = last_name;
    }

    let profile = account.profile.get_or_insert_with(Default::default);
    if update.phone_number.is_some() {
        profile.phone_number = update.phone_number;
    }
    if update.description.is_some() {
        profile.description = update.description;
    }

    db.update_account(&account).await?;
    tracing::debug!("updated profile of '{}'", account.username);

    Ok(Json(ProfileUpdateResponse {
        message: "Profile updated successfully".to_string(),
        user: profile_view(db.inner().as_ref(), account).await?,
    }))
}

#[cfg(test)]
mod profile_endpoints {
    use std::sync::Arc;

    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    use crate::data::memory::MemoryStore;
    use crate::data::{IdentityStore, MembershipStore};
    use crate::role::{CourseRole, Role};
    use crate::test_support::{self, bearer, seed_account, seed_course};

    #[rocket::async_test]
    async fn v1_profile_lists_joined_and_created_courses() {
        let store = Arc::new(MemoryStore::new());
        let teacher = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let student = seed_account(&*store, "sam", Some(Role::Student)).await;
        let course = seed_course(&*store, &teacher, "Algebra").await;
        store
            .get_or_create_membership(course.id, student.id, CourseRole::Student)
            .await
            .unwrap();
        let client = test_support::client(store).await;

        let response = client
            .get("/api/v1/profile")
            .header(bearer(&student))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["role"], "student");
        assert_eq!(body["courses_joined"][0]["name"], "Algebra");
        assert_eq!(body["courses_created"], json!([]));

        let response = client
            .get("/api/v1/profile")
            .header(bearer(&teacher))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["courses_joined"], json!([]));
        assert_eq!(body["courses_created"][0]["id"], course.id);
    }

    #[rocket::async_test]
    async fn v1_profile_update_creates_missing_profile() {
        let store = Arc::new(MemoryStore::new());
        let ghost = seed_account(&*store, "ghost", None).await;
        let client = test_support::client(store.clone()).await;

        let response = client
            .put("/api/v1/profile")
            .header(ContentType::JSON)
            .header(bearer(&ghost))
            .body(json!({"first_name": "Casper", "description": "boo"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "Profile updated successfully");
        assert_eq!(body["user"]["role"], "student");

        let stored = store.get_account(ghost.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Casper");
        assert_eq!(
            stored.profile.and_then(|it| it.description).as_deref(),
            Some("boo")
        );
    }

    #[rocket::async_test]
    async fn v1_profile_update_rejects_bad_email() {
        let store = Arc::new(MemoryStore::new());
        let sam = seed_account(&*store, "sam", Some(Role::Student)).await;
        let client = test_support::client(store).await;

        let response = client
            .put("/api/v1/profile")
            .header(ContentType::JSON)
            .header(bearer(&sam))
            .body(json!({"email": "not-an-email"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
    }
}
