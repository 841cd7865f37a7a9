use axum::routing::get;
use axum::{
    extract::{Extension, Path},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    Json, Router,
};
use serde_json::json;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::middleware::logging::{to_response, ApiError};
use crate::routes::AppState;

//Routers
pub fn media_routes() -> Router {
    Router::new().route("/media/*path", get(serve_media))
}

//Routes
pub async fn serve_media(
    Path(path): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    let file = match state.lifecycle.storage().open_stream(&path).await {
        Ok(file) => file,
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::InvalidInput) => {
            return to_response(
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({
                        "error": "Not found"
                    })),
                ),
                Err(ApiError::General(err.to_string())),
            )
        }
        Err(err) => {
            return to_response(
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error"
                    })),
                ),
                Err(ApiError::StorageError(err.to_string())),
            )
        }
    };

    let content_type = mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let stream = ReaderStream::new(file);
    let body = axum::body::Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline"),
    );

    to_response((headers, body), Ok(()))
}
