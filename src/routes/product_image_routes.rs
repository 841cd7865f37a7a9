use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path},
    http::StatusCode,
    response::Response,
    routing::{patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::middleware::logging::{error_response, to_response, ApiError};
use crate::routes::AppState;
use crate::services::product_image::{
    self as product_image_service, NewProductImage, ProductImagePatch,
};

/// Room for the non-file multipart fields on top of the file itself.
const FORM_OVERHEAD: usize = 64 * 1024;

//ROUTERS
pub fn admin_product_image_routes(file_size_limit: usize) -> Router {
    Router::new()
        .route(
            "/products/:id/images",
            post(upload).layer(DefaultBodyLimit::max(file_size_limit + FORM_OVERHEAD)),
        )
        .route("/images/:id", patch(patch_image).delete(delete_image))
}

//ROUTES
async fn upload(
    Path(product_id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut is_main = false;
    let mut cropping = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let tmp = format!("Invalid multipart request: {err}");
                return to_response(
                    (StatusCode::BAD_REQUEST, Json(json!({ "error": tmp }))),
                    Err(ApiError::General(tmp)),
                );
            }
        };

        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let file_name = match field.file_name() {
                    Some(file_name) => file_name.to_owned(),
                    None => {
                        let tmp = "File name is not set.";
                        return to_response(
                            (StatusCode::BAD_REQUEST, Json(json!({ "error": tmp }))),
                            Err(ApiError::General(tmp.to_string())),
                        );
                    }
                };
                match field.bytes().await {
                    Ok(data) => file = Some((file_name, data.to_vec())),
                    Err(err) => {
                        return to_response(
                            (
                                StatusCode::BAD_REQUEST,
                                Json(json!({
                                    "error": "Failed to read file bytes."
                                })),
                            ),
                            Err(ApiError::General(format!("Multipart error: {err}"))),
                        );
                    }
                }
            }
            "is_main" | "cropping" => {
                let text = match field.text().await {
                    Ok(text) => text,
                    Err(err) => {
                        let tmp = format!("Failed to read field `{name}`: {err}");
                        return to_response(
                            (StatusCode::BAD_REQUEST, Json(json!({ "error": tmp }))),
                            Err(ApiError::General(tmp)),
                        );
                    }
                };
                if name == "is_main" {
                    is_main = matches!(text.trim(), "true" | "1" | "on");
                } else {
                    cropping = Some(text);
                }
            }
            _ => {}
        }
    }

    let Some((filename, content)) = file else {
        let tmp = "No 'file' field found.";
        return to_response(
            (StatusCode::BAD_REQUEST, Json(json!({ "error": tmp }))),
            Err(ApiError::General(tmp.to_string())),
        );
    };

    let new = NewProductImage {
        product_id,
        filename,
        content,
        cropping,
        is_main,
    };
    match product_image_service::add_product_image(
        &state.db,
        &state.lifecycle,
        state.file_size_limit,
        new,
    )
    .await
    {
        Ok(image) => to_response((StatusCode::CREATED, Json(image)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn patch_image(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PatchImagePayload>,
) -> Response {
    let patch = ProductImagePatch {
        is_main: payload.is_main,
        cropping: payload.cropping,
    };
    match product_image_service::update_product_image(&state.db, &state.lifecycle, id, patch).await {
        Ok(image) => to_response((StatusCode::OK, Json(image)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn delete_image(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    match product_image_service::delete_product_image(&state.db, &state.lifecycle, id).await {
        Ok(()) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource deleted successfully."
                })),
            ),
            Ok(()),
        ),
        Err(err) => error_response(err),
    }
}

//structs
#[derive(Deserialize)]
struct PatchImagePayload {
    is_main: Option<bool>,
    cropping: Option<String>,
}
