use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};
use std::io::Cursor;
use std::sync::Arc;

use crate::entities::product_image::{self, CropBox};
use crate::error::CatalogResult;
use crate::storage::FileStorage;

/// JPEG quality of every derived variant.
const JPEG_QUALITY: u8 = 85;

const CACHE_PREFIX: &str = "cache";

/// Named transforms applied to product images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    /// 600x600 square, cropped to the editor's crop box.
    Default,
    /// 320x320 bounding box, never cropped.
    Preview,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Default, Variant::Preview];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Default => "default",
            Variant::Preview => "preview",
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Variant::Default => (600, 600),
            Variant::Preview => (320, 320),
        }
    }

    fn crops(&self) -> bool {
        matches!(self, Variant::Default)
    }
}

/// Cache of derived renditions keyed by source path and variant.
#[async_trait]
pub trait ThumbnailEngine: Send + Sync {
    /// Returns the storage path of the variant, rendering it on first access.
    async fn get_variant(&self, image: &product_image::Model, variant: Variant) -> CatalogResult<String>;

    /// Drops every cached variant of the file at `source_path`.
    async fn clear(&self, source_path: &str) -> CatalogResult<()>;
}

pub fn variant_path(source_path: &str, variant: Variant) -> String {
    format!("{CACHE_PREFIX}/{source_path}.{}.jpg", variant.name())
}

/// Renders variants with the `image` crate and keeps them next to the
/// sources in the same file storage.
pub struct ImageThumbnailer {
    storage: Arc<dyn FileStorage>,
}

impl ImageThumbnailer {
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        ImageThumbnailer { storage }
    }
}

#[async_trait]
impl ThumbnailEngine for ImageThumbnailer {
    async fn get_variant(&self, image: &product_image::Model, variant: Variant) -> CatalogResult<String> {
        let path = variant_path(&image.image, variant);
        if self.storage.exists(&path).await? {
            return Ok(path);
        }

        let source = self.storage.open(&image.image).await?;
        let crop = image.crop_box();
        let rendered = tokio::task::spawn_blocking(move || render(&source, variant, crop))
            .await
            .map_err(std::io::Error::other)??;

        self.storage.save(&path, &rendered).await?;
        tracing::debug!(source = %image.image, variant = variant.name(), "Rendered thumbnail");
        Ok(path)
    }

    async fn clear(&self, source_path: &str) -> CatalogResult<()> {
        for variant in Variant::ALL {
            self.storage.delete(&variant_path(source_path, variant)).await?;
        }
        Ok(())
    }
}

pub fn render(source: &[u8], variant: Variant, crop: Option<CropBox>) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(source)?;
    let (width, height) = variant.size();

    let out = if variant.crops() {
        match crop.and_then(|crop| clamp(&img, crop)) {
            Some(crop) => img
                .crop_imm(crop.x1, crop.y1, crop.width(), crop.height())
                .resize_to_fill(width, height, FilterType::Lanczos3),
            None => img.resize_to_fill(width, height, FilterType::Lanczos3),
        }
    } else {
        img.thumbnail(width, height)
    };

    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    out.to_rgb8().write_with_encoder(encoder)?;
    Ok(buffer)
}

// Crop boxes are picked on whatever file was current at the time, so keep
// them inside the actual bounds.
fn clamp(img: &DynamicImage, crop: CropBox) -> Option<CropBox> {
    let x2 = crop.x2.min(img.width());
    let y2 = crop.y2.min(img.height());
    if x2 <= crop.x1 || y2 <= crop.y1 {
        return None;
    }
    Some(CropBox { x1: crop.x1, y1: crop.y1, x2, y2 })
}
