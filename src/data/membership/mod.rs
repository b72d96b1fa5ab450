use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::CourseRole;

pub mod db;

/// Links an account to a course. Identified by the (`course_id`, `user_id`)
/// pair, which the store keeps unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub course_id: i64,
    pub user_id: i64,
    pub role: CourseRole,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(course_id: i64, user_id: i64, role: CourseRole) -> Membership {
        let now = Utc::now();
        Membership {
            course_id,
            user_id,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of a get-or-create.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub membership: Membership,
    pub created: bool,
}
