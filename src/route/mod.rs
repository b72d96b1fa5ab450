use std::collections::BTreeMap;

use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::{Build, Request, Rocket, Route};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod announcements;
pub mod bookmarks;
pub mod categories;
pub mod contents;
pub mod courses;
pub mod enroll;
pub mod profile;
pub mod users;
pub mod view;

use announcements::*;
use bookmarks::*;
use categories::*;
use contents::*;
use courses::*;
use enroll::*;
use profile::*;
use users::*;
use view::*;

use crate::{
    enroll::BatchEnrollRequest,
    resp::{auth::AuthFailure, jwt::doc::JWTAuth, problem::Problem},
    role::{CourseRole, Role},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        register,
        login,
        token_refresh,
        user_list,
        profile_get,
        profile_update,
        course_list,
        course_create,
        course_update,
        course_delete,
        course_enroll,
        batch_enroll,
        content_list,
        content_create,
        announcement_list,
        announcement_create,
        announcement_update,
        announcement_delete,
        category_list,
        category_create,
        category_delete,
        bookmark_list,
        bookmark_create,
        bookmark_delete
    ),
    components(schemas(
        Role,
        CourseRole,
        Problem,
        MessageResponse,
        CategoryView,
        CourseView,
        ContentView,
        UserListItem,
        AccountView,
        RegisterRequest,
        RegisterResponse,
        LoginRequest,
        TokenPair,
        RefreshRequest,
        AccessToken,
        ProfileView,
        ProfileUpdate,
        ProfileUpdateResponse,
        CourseCreate,
        CourseUpdate,
        CourseResponse,
        MembershipView,
        EnrollResponse,
        BatchEnrollRequest,
        BatchEnrollResponse,
        ContentListResponse,
        ContentCreate,
        ContentResponse,
        AnnouncementView,
        AnnouncementCreate,
        AnnouncementUpdate,
        AnnouncementResponse,
        CategoryCreate,
        CategoryResponse,
        BookmarkView,
        BookmarkListResponse,
        BookmarkCreate,
        BookmarkResponse
    )),
    modifiers(&JWTAuth, &V1_PREFIX)
)]
pub struct ApiDocV1;

pub struct PathPrefix(pub &'static str);
static V1_PREFIX: PathPrefix = PathPrefix("/api/v1");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

pub fn api_v1() -> Vec<Route> {
    routes![
        register,
        login,
        token_refresh,
        user_list,
        profile_get,
        profile_update,
        course_list,
        course_create,
        course_update,
        course_delete,
        course_enroll,
        batch_enroll,
        content_list,
        content_create,
        announcement_list,
        announcement_create,
        announcement_update,
        announcement_delete,
        category_list,
        category_create,
        category_delete,
        bookmark_list,
        bookmark_create,
        bookmark_delete
    ]
}

#[get("/")]
pub fn index() -> RawHtml<&'static str> {
    RawHtml("<h1>Welcome to Simple LMS API</h1>")
}

/// Renders every error Rocket produces itself (failed guards, unknown
/// routes, unparsable bodies) as a problem document. Auth failures keep the
/// detail the [`Principal`](crate::resp::auth::Principal) guard recorded.
#[catch(default)]
pub fn problem_catcher(status: Status, req: &Request<'_>) -> Problem {
    if let AuthFailure(Some(problem)) = req.local_cache(|| AuthFailure(None)) {
        if problem.status == status {
            return problem.clone();
        }
    }

    Problem::new_untyped(status, status.reason().unwrap_or("Unknown error."))
        .instance_uri(req.uri())
        .clone()
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/v1", api_v1())
        .mount(
            "/",
            SwaggerUi::new("/swagger/<_..>").url("/api/v1/openapi.json", ApiDocV1::openapi()),
        )
        .mount("/", routes![index])
        .register("/", catchers![problem_catcher])
}
