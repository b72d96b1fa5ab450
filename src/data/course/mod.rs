use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod db;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    /// Owning teacher.
    pub teacher: i64,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_owned_by(&self, account_id: i64) -> bool {
        self.teacher == account_id
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub teacher: i64,
    pub category: Option<i64>,
}

impl NewCourse {
    pub fn into_course(self, id: i64) -> Course {
        let now = Utc::now();
        Course {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            teacher: self.teacher,
            category: self.category,
            created_at: now,
            updated_at: now,
        }
    }
}
