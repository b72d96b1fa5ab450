use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::{self, Json};
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::Db;
use crate::enroll::{self, BatchEnrollRequest, EnrollError, EnrollmentReport};
use crate::resp::auth::Principal;
use crate::resp::problem::Problem;

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchEnrollResponse {
    pub message: String,
    pub enrolled_students: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found_student_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_not_found_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_role_usernames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_role_message: Option<String>,
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

impl From<EnrollmentReport> for BatchEnrollResponse {
    fn from(report: EnrollmentReport) -> Self {
        BatchEnrollResponse {
            message: "Proses batch enroll selesai.".to_string(),
            user_not_found_message: report.not_found_message(),
            invalid_role_message: report.invalid_role_message(),
            enrolled_students: report.enrolled,
            not_found_student_ids: non_empty(report.not_found),
            invalid_role_usernames: non_empty(report.invalid_role),
        }
    }
}

/// Empty buckets are sent as explicit `null`s.
fn nothing_enrolled(report: EnrollmentReport) -> Problem {
    Problem::new_untyped(Status::BadRequest, "No student was enrolled.")
        .insert_str("error", "Tidak ada siswa yang berhasil didaftarkan.")
        .insert("not_found_student_ids", non_empty(report.not_found.clone()))
        .insert("user_not_found_message", report.not_found_message())
        .insert(
            "invalid_role_usernames",
            non_empty(report.invalid_role.clone()),
        )
        .insert("invalid_role_message", report.invalid_role_message())
        .clone()
}

/// Enroll many students into one owned course
///
/// Every id is reported in at most one bucket: `enrolled_students`,
/// `not_found_student_ids` or `invalid_role_usernames`. Students that were
/// already members appear in none of them, so a batch containing only
/// those is answered with 400.
#[utoipa::path(
    request_body = BatchEnrollRequest,
    responses(
        (status = 201, description = "At least one student enrolled", body = BatchEnrollResponse),
        (status = 400, description = "Nothing enrolled, invalid payload or caller without profile", body = Problem),
        (status = 401, description = "Missing or expired token", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "Course doesn't exist or isn't owned by caller", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/batch-enroll", data = "<payload>")]
#[tracing::instrument(skip(payload, db))]
pub async fn batch_enroll<'r>(
    caller: Principal,
    payload: Result<Json<BatchEnrollRequest>, json::Error<'r>>,
    db: &State<Db>,
) -> Result<status::Custom<Json<BatchEnrollResponse>>, Problem> {
    // Role goes first so non-teachers never learn anything about the payload.
    // batch_enroll checks again for callers outside this route.
    enroll::authorize_batch(&caller.account)?;

    let request = payload
        .map_err(|e| EnrollError::Invalid(e.to_string()))?
        .into_inner();
    tracing::debug!(
        "batch enroll of {} ids into course {}",
        request.student_ids.len(),
        request.course_id
    );

    let report = enroll::batch_enroll(db.inner().as_ref(), &caller.account, &request).await?;

    if report.nothing_enrolled() {
        return Err(nothing_enrolled(report));
    }

    Ok(status::Custom(
        Status::Created,
        Json(BatchEnrollResponse::from(report)),
    ))
}

#[cfg(test)]
mod batch_enroll_endpoint {
    use std::sync::Arc;

    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{json, Value};

    use crate::data::account::Account;
    use crate::data::memory::MemoryStore;
    use crate::role::Role;
    use crate::test_support::{self, bearer, seed_account, seed_course};

    struct Fixture {
        client: Client,
        store: Arc<MemoryStore>,
        teacher: Account,
        student: Account,
        other_teacher: Account,
        course: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let teacher = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let student = seed_account(&*store, "alice", Some(Role::Student)).await;
        let other_teacher = seed_account(&*store, "carol", Some(Role::Teacher)).await;
        let course = seed_course(&*store, &teacher, "Algebra").await.id;

        Fixture {
            client: test_support::client(store.clone()).await,
            store,
            teacher,
            student,
            other_teacher,
            course,
        }
    }

    async fn submit(f: &Fixture, caller: &Account, body: String) -> (Status, Value) {
        let response = f
            .client
            .post("/api/v1/batch-enroll")
            .header(ContentType::JSON)
            .header(bearer(caller))
            .body(body)
            .dispatch()
            .await;
        let status = response.status();
        let body = response.into_json().await.unwrap_or(Value::Null);
        (status, body)
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_mixed_batch() {
        let f = fixture().await;
        let body = json!({
            "course_id": f.course,
            "student_ids": [f.student.id, f.other_teacher.id, 999],
        })
        .to_string();

        let (status, body) = submit(&f, &f.teacher, body).await;

        assert_eq!(status, Status::Created);
        assert_eq!(body["message"], "Proses batch enroll selesai.");
        assert_eq!(body["enrolled_students"], json!(["alice"]));
        assert_eq!(body["not_found_student_ids"], json!([999]));
        assert_eq!(
            body["user_not_found_message"],
            "User berikut tidak ditemukan di database: [999]"
        );
        assert_eq!(body["invalid_role_usernames"], json!(["carol"]));
        assert_eq!(
            body["invalid_role_message"],
            "User berikut bukan siswa: ['carol']"
        );
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_omits_empty_buckets() {
        let f = fixture().await;
        let body = json!({"course_id": f.course, "student_ids": [f.student.id]}).to_string();

        let (status, body) = submit(&f, &f.teacher, body).await;

        assert_eq!(status, Status::Created);
        let mut keys: Vec<&str> = body
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["enrolled_students", "message"]);
    }

    // Known quirk: repeating a batch whose only enrollable student is now a
    // member answers 400 although the course is exactly as requested.
    #[rocket::async_test]
    async fn v1_batch_enroll_rerun_is_reported_as_failure() {
        let f = fixture().await;
        let body = json!({
            "course_id": f.course,
            "student_ids": [f.student.id, f.other_teacher.id, 999],
        })
        .to_string();

        let (first, _) = submit(&f, &f.teacher, body.clone()).await;
        let (second, body) = submit(&f, &f.teacher, body).await;

        assert_eq!(first, Status::Created);
        assert_eq!(second, Status::BadRequest);
        assert_eq!(body["error"], "Tidak ada siswa yang berhasil didaftarkan.");
        assert_eq!(body["not_found_student_ids"], json!([999]));
        assert_eq!(body["invalid_role_usernames"], json!(["carol"]));
        assert_eq!(f.store.membership_count(f.course), 1);
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_total_failure_uses_nulls() {
        let f = fixture().await;
        let body = json!({"course_id": f.course, "student_ids": [998, 999]}).to_string();

        let (status, body) = submit(&f, &f.teacher, body).await;

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["not_found_student_ids"], json!([998, 999]));
        assert_eq!(body["invalid_role_usernames"], Value::Null);
        assert_eq!(body["invalid_role_message"], Value::Null);
        assert!(body.as_object().unwrap().contains_key("invalid_role_usernames"));
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_forbids_students_before_parsing() {
        let f = fixture().await;

        for body in [
            json!({"course_id": f.course, "student_ids": [f.student.id]}).to_string(),
            "not even json".to_string(),
        ] {
            let (status, body) = submit(&f, &f.student, body).await;
            assert_eq!(status, Status::Forbidden);
            assert_eq!(body["error"], "Hanya teacher yang diizinkan.");
        }
        assert_eq!(f.store.membership_count(f.course), 0);
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_caller_without_profile() {
        let f = fixture().await;
        let ghost = seed_account(&*f.store, "ghost", None).await;
        let body = json!({"course_id": f.course, "student_ids": [f.student.id]}).to_string();

        let (status, body) = submit(&f, &ghost, body).await;

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["error"], "Profil pengguna tidak ditemukan.");
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_rejects_bad_payloads() {
        let f = fixture().await;

        for body in [
            json!({"course_id": f.course, "student_ids": []}).to_string(),
            json!({"course_id": f.course}).to_string(),
            "{".to_string(),
        ] {
            let (status, _) = submit(&f, &f.teacher, body.clone()).await;
            assert_eq!(status, Status::BadRequest, "payload {}", body);
        }
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_hides_foreign_courses() {
        let f = fixture().await;
        let body = json!({"course_id": f.course, "student_ids": [f.student.id]}).to_string();

        let (status, body) = submit(&f, &f.other_teacher, body).await;

        assert_eq!(status, Status::NotFound);
        assert_eq!(
            body["error"],
            "Kursus tidak ditemukan atau bukan milik Anda."
        );
        assert_eq!(f.store.membership_count(f.course), 0);
    }

    #[rocket::async_test]
    async fn v1_batch_enroll_requires_authentication() {
        let f = fixture().await;

        let response = f
            .client
            .post("/api/v1/batch-enroll")
            .header(ContentType::JSON)
            .body(json!({"course_id": f.course, "student_ids": [1]}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Unauthorized);
    }
}
