use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::entities::category::{self, Entity as CategoryEntity};
use crate::middleware::logging::{error_response, to_response, ApiError};
use crate::routes::{AppState, SLUG_REGEX};
use crate::services::category::{self as category_service, CategoryPatch, NewCategory};

//ROUTERS
pub fn category_routes() -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/:id", get(get_category))
}

pub fn admin_category_routes() -> Router {
    Router::new()
        .route("/categories", post(create_category))
        .route(
            "/categories/:id",
            patch(patch_category).delete(delete_category),
        )
}

//ROUTES
async fn get_categories(Extension(state): Extension<Arc<AppState>>) -> Response {
    let result = CategoryEntity::find()
        .order_by_asc(category::Column::Title)
        .order_by_asc(category::Column::Id)
        .all(&state.db)
        .await;

    match result {
        Ok(categories) => {
            let body: Vec<CategoryResponse> =
                categories.into_iter().map(CategoryResponse::new).collect();
            to_response((StatusCode::OK, Json(body)), Ok(()))
        }
        Err(err) => error_response(err.into()),
    }
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    match CategoryEntity::find_by_id(id).one(&state.db).await {
        Ok(Some(category)) => to_response(
            (StatusCode::OK, Json(CategoryResponse::new(category))),
            Ok(()),
        ),
        Ok(None) => {
            let tmp = format!("No category with {} id was found.", id);
            to_response(
                (StatusCode::NOT_FOUND, Json(json!({ "error": tmp }))),
                Err(ApiError::General(tmp)),
            )
        }
        Err(err) => error_response(err.into()),
    }
}

async fn create_category(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateCategory>,
) -> Response {
    if let Err(err) = payload.validate() {
        return to_response(
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))),
            Err(ApiError::ValidationFail(err.to_string())),
        );
    }

    let new = NewCategory {
        title: payload.title,
        parent_id: payload.parent_id,
        slug: payload.slug,
    };
    match category_service::create_category(&state.db, new).await {
        Ok(category) => to_response((StatusCode::CREATED, Json(category)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn patch_category(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PatchCategory>,
) -> Response {
    if let Err(err) = payload.validate() {
        return to_response(
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))),
            Err(ApiError::ValidationFail(err.to_string())),
        );
    }

    let patch = CategoryPatch {
        title: payload.title,
        parent_id: payload.parent_id,
    };
    match category_service::update_category(&state.db, id, patch).await {
        Ok(category) => to_response((StatusCode::OK, Json(category)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn delete_category(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    match category_service::delete_category(&state.db, id).await {
        Ok(deleted) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource deleted successfully.",
                    "deleted": deleted
                })),
            ),
            Ok(()),
        ),
        Err(err) => error_response(err),
    }
}

//Structs
#[derive(Deserialize, Validate)]
struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    title: String,
    parent_id: Option<i32>,
    #[validate(regex(path = *SLUG_REGEX), length(max = 50))]
    slug: Option<String>,
}

#[derive(Deserialize, Validate)]
struct PatchCategory {
    #[validate(length(min = 1, max = 100))]
    title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    parent_id: Option<Option<i32>>,
}

#[derive(Serialize)]
struct CategoryResponse {
    id: i32,
    title: String,
    parent_id: Option<i32>,
}

impl CategoryResponse {
    fn new(value: category::Model) -> CategoryResponse {
        CategoryResponse {
            id: value.id,
            title: value.title,
            parent_id: value.parent_id,
        }
    }
}

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}
