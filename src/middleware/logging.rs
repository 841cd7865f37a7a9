use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::CatalogError;

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();
    match response.extensions().get::<Result<(), ApiError>>() {
        Some(Ok(_)) => info!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        ),
        Some(Err(value)) => error!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Failed to process request"
        ),
        None => warn!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request, but no Response extension is set"
        ),
    }

    response
}

#[derive(Clone, Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    DbError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Failed to validate: {0}")]
    ValidationFail(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Identifier space exhausted: {0}")]
    Exhausted(String),
    #[error("{0}")]
    General(String),
}

pub fn to_response<T: IntoResponse>(
    response: T,               //The response that we are sending + StatusCode
    ext: Result<(), ApiError>, //The extension, that we want to give logging middleware
) -> Response {
    let mut response = response.into_response();

    response.extensions_mut().insert(ext);

    response
}

/// Maps a service failure to its HTTP status and JSON body.
pub fn error_response(err: CatalogError) -> Response {
    let (status, message, ext) = match &err {
        CatalogError::NotFound(msg) => (
            StatusCode::NOT_FOUND,
            msg.clone(),
            ApiError::General(msg.clone()),
        ),
        CatalogError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            msg.clone(),
            ApiError::ValidationFail(msg.clone()),
        ),
        CatalogError::UniqueConflict(_) => (
            StatusCode::CONFLICT,
            "Resource with the same identifier already exists".to_string(),
            ApiError::Conflict(err.to_string()),
        ),
        CatalogError::Protected(msg) => (
            StatusCode::CONFLICT,
            msg.clone(),
            ApiError::Conflict(msg.clone()),
        ),
        CatalogError::NamespaceExhausted { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Could not allocate a unique identifier, try again later".to_string(),
            ApiError::Exhausted(err.to_string()),
        ),
        CatalogError::Db(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
            ApiError::DbError(err.to_string()),
        ),
        CatalogError::Storage(_) | CatalogError::Thumbnail(_) | CatalogError::CopyNotConfirmed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
            ApiError::StorageError(err.to_string()),
        ),
    };

    to_response((status, Json(json!({ "error": message }))), Err(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (CatalogError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CatalogError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (CatalogError::UniqueConflict("x".into()), StatusCode::CONFLICT),
            (CatalogError::Protected("x".into()), StatusCode::CONFLICT),
            (
                CatalogError::NamespaceExhausted { field: "sku", attempts: 50 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (CatalogError::CopyNotConfirmed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let response = error_response(err);
            assert_eq!(response.status(), status);
            assert!(matches!(
                response.extensions().get::<Result<(), ApiError>>(),
                Some(Err(_))
            ));
        }
    }
}
