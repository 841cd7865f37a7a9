pub mod attribute_routes;
pub mod category_routes;
pub mod media_routes;
pub mod product_image_routes;
pub mod product_routes;

use axum::{middleware, Extension, Router};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::middleware::logging::logging_middleware;
use crate::services::image_lifecycle::ImageLifecycle;

use {
    attribute_routes::admin_attribute_routes,
    category_routes::{admin_category_routes, category_routes},
    media_routes::media_routes,
    product_image_routes::admin_product_image_routes,
    product_routes::{admin_product_routes, product_routes},
};

pub struct AppState {
    pub db: DatabaseConnection,
    pub lifecycle: ImageLifecycle,
    pub file_size_limit: usize,
}

pub fn api_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .merge(category_routes())
        .merge(product_routes());
    let admin_routes = Router::new()
        .merge(admin_category_routes())
        .merge(admin_product_routes())
        .merge(admin_attribute_routes())
        .merge(admin_product_image_routes(state.file_size_limit));

    Router::new()
        .merge(media_routes())
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .layer(Extension(state))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

// Empty is allowed: it asks for a generated slug.
pub(crate) static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z0-9]+(-[a-z0-9]+)*)?$").unwrap());
