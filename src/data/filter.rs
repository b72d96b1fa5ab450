use bson::{doc, Document};

#[inline]
pub fn by_id(id: i64) -> Document {
    doc! { "_id": id }
}

#[inline]
pub fn by_username(username: impl AsRef<str>) -> Document {
    doc! { "username": username.as_ref() }
}

#[inline]
pub fn by_ids(ids: &[i64]) -> Document {
    doc! { "_id": { "$in": ids.to_vec() } }
}

#[inline]
pub fn membership(course_id: i64, user_id: i64) -> Document {
    doc! { "course_id": course_id, "user_id": user_id }
}
