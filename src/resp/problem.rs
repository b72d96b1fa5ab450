use std::fmt::{Display, Formatter};
use std::io::Cursor;

use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::enroll::EnrollError;
use crate::error::StoreError;
use crate::role::Role;

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
///
/// Extra members in `body` are flattened next to the standard ones, which is
/// how endpoint-specific keys like `error` reach the client.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    #[schema(value_type = u16)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,
    pub instance_uri: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            instance_uri: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn instance_uri(&mut self, value: impl ToString) -> &mut Problem {
        self.instance_uri = Some(value.to_string());
        self
    }

    pub fn insert<V: Serialize>(&mut self, key: impl ToString, value: V) -> &mut Problem {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Value of an extension member, mostly for assertions.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut body = self.body.clone();

        // Following are required by rfc7807
        body.insert("type".to_string(), Value::from(self.type_uri.clone()));
        body.insert("title".to_string(), Value::from(self.title.clone()));

        // Optional parameters as specified by rfc7807
        if let Some(detail) = &self.detail {
            body.insert("detail".to_string(), Value::from(detail.clone()));
        }
        body.insert("status".to_string(), Value::from(self.status.code));
        if let Some(instance) = &self.instance_uri {
            body.insert("instance".to_string(), Value::from(instance.clone()));
        }

        body
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.title)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body_string = Value::Object(self.to_json()).to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header("Content-Language", "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn not_found(what: &str) -> Problem {
        Problem::new_untyped(Status::NotFound, format!("{} not found", what))
            .insert_str("message", format!("{} not found", what))
            .clone()
    }

    #[inline]
    pub fn bad_request(message: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad request.")
            .insert_str("message", message)
            .clone()
    }

    #[inline]
    pub fn forbidden(message: impl ToString) -> Problem {
        Problem::new_untyped(Status::Forbidden, "Forbidden.")
            .insert_str("message", message)
            .clone()
    }

    #[inline]
    pub fn internal(detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::InternalServerError, "Internal server error.")
            .detail(detail)
            .clone()
    }
}

fn mongodb_problem(e: &mongodb::error::Error) -> Problem {
    use mongodb::error::ErrorKind;

    fn db_failure() -> Problem {
        Problem::new_untyped(
            Status::InternalServerError,
            "MongoDB failed while processing request.",
        )
    }

    fn access_problem() -> Problem {
        Problem::new_untyped(
            Status::ServiceUnavailable,
            "Server was unable to access MongoDB.",
        )
    }

    match e.kind.as_ref() {
        ErrorKind::Authentication { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::InvalidTlsConfig { .. }
        | ErrorKind::IncompatibleServer { .. } => access_problem(),
        ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
            Problem::new_untyped(
                Status::InternalServerError,
                "There was a problem with handling MongoDB bson.",
            )
        }
        ErrorKind::Io(_) => db_failure()
            .detail("An IO error occurred. Submitted data might not be properly stored.")
            .clone(),
        ErrorKind::Write(_) => db_failure()
            .detail("A write error occurred. Submitted data might not be properly stored.")
            .clone(),
        _ => db_failure(),
    }
}

impl From<StoreError> for Problem {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::Conflict { entity, key } => {
                Problem::new_untyped(Status::BadRequest, "Already exists.")
                    .insert_str("message", format!("{} '{}' already exists", entity, key))
                    .clone()
            }
            StoreError::Database(db) => {
                tracing::error!("database failure: {}", db);
                mongodb_problem(db)
            }
            _ => {
                tracing::error!("store failure: {}", e);
                problems::internal(e)
            }
        }
    }
}

impl From<EnrollError> for Problem {
    fn from(e: EnrollError) -> Self {
        let (status, title, message) = match e {
            EnrollError::MissingProfile => (
                Status::BadRequest,
                "Bad request.",
                "Profil pengguna tidak ditemukan.".to_string(),
            ),
            EnrollError::Forbidden(Role::Teacher) => (
                Status::Forbidden,
                "Forbidden.",
                "Hanya teacher yang diizinkan.".to_string(),
            ),
            EnrollError::Forbidden(Role::Student) => (
                Status::Forbidden,
                "Forbidden.",
                "Hanya siswa yang diizinkan.".to_string(),
            ),
            EnrollError::Invalid(message) => (
                Status::BadRequest,
                "There was a problem parsing part of the request.",
                message,
            ),
            EnrollError::CourseNotFound(_) => (
                Status::NotFound,
                "Course not found.",
                "Kursus tidak ditemukan atau bukan milik Anda.".to_string(),
            ),
            EnrollError::Store(e) => return Problem::from(e),
        };

        Problem::new_untyped(status, title)
            .insert_str("error", message)
            .clone()
    }
}

impl From<jsonwebtoken::errors::Error> for Problem {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.into_kind() {
            ErrorKind::ExpiredSignature => {
                Problem::new_untyped(Status::Unauthorized, "Expired JWT signature.")
            }
            _ => Problem::new_untyped(Status::Unauthorized, "Error while handling JWT."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_members_sit_next_to_standard_ones() {
        let problem = Problem::new_untyped(Status::Forbidden, "Forbidden.")
            .insert_str("error", "Hanya teacher yang diizinkan.")
            .insert("ids", vec![1, 2])
            .detail("nope")
            .clone();

        let json = problem.to_json();

        assert_eq!(json["type"], "about:blank");
        assert_eq!(json["status"], 403);
        assert_eq!(json["error"], "Hanya teacher yang diizinkan.");
        assert_eq!(json["ids"], serde_json::json!([1, 2]));
        assert_eq!(json["detail"], "nope");
        assert!(!json.contains_key("instance"));
    }

    #[test]
    fn enroll_errors_carry_their_message_under_error() {
        let forbidden = Problem::from(EnrollError::Forbidden(Role::Teacher));
        let foreign = Problem::from(EnrollError::CourseNotFound(3));
        let no_profile = Problem::from(EnrollError::MissingProfile);

        assert_eq!(forbidden.status, Status::Forbidden);
        assert_eq!(
            forbidden.get("error"),
            Some(&Value::from("Hanya teacher yang diizinkan."))
        );
        assert_eq!(foreign.status, Status::NotFound);
        assert_eq!(
            foreign.get("error"),
            Some(&Value::from("Kursus tidak ditemukan atau bukan milik Anda."))
        );
        assert_eq!(no_profile.status, Status::BadRequest);
    }

    #[test]
    fn conflicts_become_bad_requests() {
        let problem = Problem::from(StoreError::Conflict {
            entity: "username",
            key: "alice".to_string(),
        });

        assert_eq!(problem.status, Status::BadRequest);
        assert_eq!(
            problem.get("message"),
            Some(&Value::from("username 'alice' already exists"))
        );
    }
}
