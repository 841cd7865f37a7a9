use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::entities::attribute::ValueType;
use crate::middleware::logging::{error_response, to_response, ApiError};
use crate::routes::{AppState, SLUG_REGEX};
use crate::services::attribute::{self as attribute_service, NewAttribute};

//ROUTERS
pub fn admin_attribute_routes() -> Router {
    Router::new()
        .route("/attributes", post(create_attribute))
        .route("/attributes/:id/values", post(add_attribute_value))
        .route(
            "/products/:id/attributes/:attribute_id",
            put(set_product_attribute).delete(remove_product_attribute),
        )
}

//ROUTES
async fn create_attribute(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateAttribute>,
) -> Response {
    if let Err(err) = payload.validate() {
        return to_response(
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))),
            Err(ApiError::ValidationFail(err.to_string())),
        );
    }

    let new = NewAttribute {
        name: payload.name,
        value_type: payload.value_type.unwrap_or_default(),
        slug: payload.slug,
    };
    match attribute_service::create_attribute(&state.db, new).await {
        Ok(attribute) => to_response((StatusCode::CREATED, Json(attribute)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn add_attribute_value(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ValuePayload>,
) -> Response {
    match attribute_service::add_attribute_value(&state.db, id, payload.value).await {
        Ok(value) => to_response((StatusCode::CREATED, Json(value)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn set_product_attribute(
    Path((product_id, attribute_id)): Path<(i32, i32)>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ValuePayload>,
) -> Response {
    match attribute_service::set_product_attribute(&state.db, product_id, attribute_id, payload.value)
        .await
    {
        Ok(line) => to_response((StatusCode::OK, Json(line)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn remove_product_attribute(
    Path((product_id, attribute_id)): Path<(i32, i32)>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    match attribute_service::remove_product_attribute(&state.db, product_id, attribute_id).await {
        Ok(true) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource deleted successfully."
                })),
            ),
            Ok(()),
        ),
        Ok(false) => {
            let tmp = format!("Product {product_id} has no value for attribute {attribute_id}.");
            to_response(
                (StatusCode::NOT_FOUND, Json(json!({ "error": tmp }))),
                Err(ApiError::General(tmp)),
            )
        }
        Err(err) => error_response(err),
    }
}

//Structs
#[derive(Deserialize, Validate)]
struct CreateAttribute {
    #[validate(length(min = 1, max = 100))]
    name: String,
    value_type: Option<ValueType>,
    #[validate(regex(path = *SLUG_REGEX), length(max = 50))]
    slug: Option<String>,
}

#[derive(Deserialize)]
struct ValuePayload {
    value: String,
}
