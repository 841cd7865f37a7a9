use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;

use crate::config::WarmingMode;
use crate::entities::product_image;
use crate::error::{CatalogError, CatalogResult};
use crate::services::image_path::{extension, plan_path, product_dir};
use crate::storage::FileStorage;
use crate::thumbnails::{ThumbnailEngine, Variant};

/// Keeps stored image files in step with product slugs and owns the
/// derived-variant cache of each image.
pub struct ImageLifecycle {
    storage: Arc<dyn FileStorage>,
    thumbnails: Arc<dyn ThumbnailEngine>,
    media_url: String,
    warming: WarmingMode,
}

impl ImageLifecycle {
    pub fn new(
        storage: Arc<dyn FileStorage>,
        thumbnails: Arc<dyn ThumbnailEngine>,
        media_url: impl Into<String>,
        warming: WarmingMode,
    ) -> Self {
        ImageLifecycle {
            storage,
            thumbnails,
            media_url: media_url.into(),
            warming,
        }
    }

    pub fn storage(&self) -> &dyn FileStorage {
        self.storage.as_ref()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path)
    }

    /// Moves every image of `product_id` under `product_images/<new_slug>/`.
    ///
    /// Files are copied, the copy is confirmed, and only then is the old file
    /// removed, so the call can be repeated after a partial failure: images
    /// already under the new directory are skipped and a missing source file
    /// only re-points the record. Returns how many records were re-pointed.
    pub async fn relocate_images<C: ConnectionTrait>(
        &self,
        db: &C,
        product_id: i32,
        new_slug: &str,
    ) -> CatalogResult<usize> {
        let images = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .order_by_asc(product_image::Column::Id)
            .all(db)
            .await?;

        let mut relocated = 0;
        for image in images {
            let image_id = image.id;
            match self.relocate_one(db, image, new_slug).await {
                Ok(true) => relocated += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(
                        product_id,
                        image_id,
                        relocated,
                        new_slug,
                        error = %err,
                        "Image relocation aborted, product images are partially relocated"
                    );
                    return Err(err);
                }
            }
        }

        tracing::info!(product_id, new_slug, relocated, "Relocated product images");
        Ok(relocated)
    }

    async fn relocate_one<C: ConnectionTrait>(
        &self,
        db: &C,
        image: product_image::Model,
        new_slug: &str,
    ) -> CatalogResult<bool> {
        if image.image.is_empty() || image.image.starts_with(&product_dir(new_slug)) {
            return Ok(false);
        }

        let old_path = image.image.clone();
        let new_path = plan_path(new_slug, extension(&old_path));

        if self.storage.exists(&old_path).await? {
            let content = self.storage.open(&old_path).await?;
            self.storage.save(&new_path, &content).await?;
            if !self.storage.exists(&new_path).await? {
                return Err(CatalogError::CopyNotConfirmed(new_path));
            }
            self.storage.delete(&old_path).await?;
        } else {
            tracing::warn!(image_id = image.id, path = %old_path, "Source file missing, skipping copy");
        }

        self.thumbnails.clear(&old_path).await?;

        let mut active: product_image::ActiveModel = image.into();
        active.image = Set(new_path);
        active.update(db).await?;
        Ok(true)
    }

    /// Renders both named variants of an image that has a crop box.
    pub async fn warm_cache(&self, image: &product_image::Model) -> CatalogResult<()> {
        warm(self.thumbnails.as_ref(), image).await
    }

    /// Warms the cache now or on a background task, per configuration.
    /// Deferred failures are only logged: readers render on demand anyway.
    pub async fn schedule_warm(&self, image: product_image::Model) -> CatalogResult<()> {
        match self.warming {
            WarmingMode::Inline => self.warm_cache(&image).await,
            WarmingMode::Deferred => {
                let thumbnails = self.thumbnails.clone();
                tokio::spawn(async move {
                    if let Err(err) = warm(thumbnails.as_ref(), &image).await {
                        tracing::warn!(image_id = image.id, error = %err, "Deferred thumbnail warming failed");
                    }
                });
                Ok(())
            }
        }
    }

    pub async fn invalidate_cache(&self, image: &product_image::Model) -> CatalogResult<()> {
        self.thumbnails.clear(&image.image).await
    }

    /// Public URL of a variant, rendering it if it is not cached yet.
    pub async fn variant_url(
        &self,
        image: &product_image::Model,
        variant: Variant,
    ) -> CatalogResult<String> {
        let path = self.thumbnails.get_variant(image, variant).await?;
        Ok(self.url(&path))
    }

    /// Removes the source file and its variants.
    pub async fn discard(&self, image: &product_image::Model) -> CatalogResult<()> {
        if image.image.is_empty() {
            return Ok(());
        }
        self.thumbnails.clear(&image.image).await?;
        self.storage.delete(&image.image).await?;
        Ok(())
    }
}

async fn warm(thumbnails: &dyn ThumbnailEngine, image: &product_image::Model) -> CatalogResult<()> {
    if image.crop_box().is_none() {
        return Ok(());
    }
    for variant in Variant::ALL {
        thumbnails.get_variant(image, variant).await?;
    }
    Ok(())
}
