use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::Db;
use crate::resp::auth::Principal;
use crate::resp::problem::{problems, Problem};
use crate::route::view::{CategoryView, MessageResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryCreate {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub message: String,
    pub category: CategoryView,
}

/// List all categories
#[utoipa::path(
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryView>),
        (status = 401, description = "Missing or expired token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/categories")]
#[tracing::instrument(skip(db))]
pub async fn category_list(
    _caller: Principal,
    db: &State<Db>,
) -> Result<Json<Vec<CategoryView>>, Problem> {
    let categories = db.list_categories().await?;
    Ok(Json(categories.into_iter().map(CategoryView::from).collect()))
}

/// Create a category with a unique name
#[utoipa::path(
    request_body = CategoryCreate,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Name missing or taken", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/categories", format = "application/json", data = "<create>")]
#[tracing::instrument(skip(db))]
pub async fn category_create(
    _caller: Principal,
    create: Json<CategoryCreate>,
    db: &State<Db>,
) -> Result<status::Custom<Json<CategoryResponse>>, Problem> {
    let name = match create.into_inner().name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => return Err(problems::bad_request("Category name is required")),
    };

    let category = db.create_category(&name).await?;
    tracing::debug!("created category {} '{}'", category.id, category.name);

    Ok(status::Custom(
        Status::Created,
        Json(CategoryResponse {
            message: "Category created successfully".to_string(),
            category: category.into(),
        }),
    ))
}

/// Delete a category no course uses
#[utoipa::path(
    params(("id", description = "category ID")),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 400, description = "Category still assigned to courses", body = Problem),
        (status = 404, description = "Category doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/categories/<id>")]
#[tracing::instrument(skip(db))]
pub async fn category_delete(
    id: i64,
    _caller: Principal,
    db: &State<Db>,
) -> Result<Json<MessageResponse>, Problem> {
    if db.get_category(id).await?.is_none() {
        return Err(problems::not_found("Category"));
    }

    let in_use = db.count_courses_in_category(id).await?;
    if in_use > 0 {
        return Err(problems::bad_request(format!(
            "Category is still assigned to {} course(s)",
            in_use
        )));
    }

    if !db.delete_category(id).await? {
        return Err(problems::not_found("Category"));
    }

    Ok(Json(MessageResponse::new("Category deleted successfully")))
}

#[cfg(test)]
mod category_endpoints {
    use std::sync::Arc;

    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    use crate::data::course::NewCourse;
    use crate::data::memory::MemoryStore;
    use crate::data::{CategoryStore, CourseDirectory};
    use crate::role::Role;
    use crate::test_support::{self, bearer, seed_account};

    #[rocket::async_test]
    async fn v1_category_names_are_unique() {
        let store = Arc::new(MemoryStore::new());
        let sam = seed_account(&*store, "sam", Some(Role::Student)).await;
        let client = test_support::client(store).await;

        for (body, expected) in [
            (json!({"name": "Math"}), Status::Created),
            (json!({"name": "Math"}), Status::BadRequest),
            (json!({"name": "  "}), Status::BadRequest),
            (json!({}), Status::BadRequest),
        ] {
            let response = client
                .post("/api/v1/categories")
                .header(ContentType::JSON)
                .header(bearer(&sam))
                .body(body.to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), expected, "body {}", body);
        }

        let response = client
            .get("/api/v1/categories")
            .header(bearer(&sam))
            .dispatch()
            .await;
        let listed: Value = response.into_json().await.unwrap();
        assert_eq!(listed, json!([{"id": 1, "name": "Math"}]));
    }

    #[rocket::async_test]
    async fn v1_category_delete_refuses_assigned_categories() {
        let store = Arc::new(MemoryStore::new());
        let tina = seed_account(&*store, "tina", Some(Role::Teacher)).await;
        let used = store.create_category("Math").await.unwrap();
        let unused = store.create_category("Art").await.unwrap();
        store
            .create_course(NewCourse {
                name: "Algebra".to_string(),
                description: String::new(),
                price: 0,
                teacher: tina.id,
                category: Some(used.id),
            })
            .await
            .unwrap();
        let client = test_support::client(store.clone()).await;

        for (id, expected) in [
            (used.id, Status::BadRequest),
            (unused.id, Status::Ok),
            (unused.id, Status::NotFound),
        ] {
            let response = client
                .delete(format!("/api/v1/categories/{}", id))
                .header(bearer(&tina))
                .dispatch()
                .await;
            assert_eq!(response.status(), expected, "deleting category {}", id);
        }

        assert!(store.get_category(used.id).await.unwrap().is_some());
    }
}
