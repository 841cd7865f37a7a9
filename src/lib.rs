pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod storage;
pub mod thumbnails;

use sea_orm::{Database, DbErr};
use std::sync::Arc;

use crate::config::Config;
use crate::entities::setup_schema;
use crate::routes::AppState;
use crate::services::image_lifecycle::ImageLifecycle;
use crate::storage::{FileStorage, LocalFileStorage};
use crate::thumbnails::ImageThumbnailer;

pub use crate::routes::api_router;

/// Connects to the database, creates missing tables and wires the media
/// storage, thumbnail cache and image lifecycle together.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>, DbErr> {
    let db = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;

    let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(&config.media_root));
    let thumbnails = Arc::new(ImageThumbnailer::new(storage.clone()));
    let lifecycle = ImageLifecycle::new(storage, thumbnails, config.media_url.clone(), config.warming);

    Ok(Arc::new(AppState {
        db,
        lifecycle,
        file_size_limit: config.file_size_limit,
    }))
}
