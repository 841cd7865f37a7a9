use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};

use crate::entities::{
    product,
    product_image::{self, CropBox},
};
use crate::error::{CatalogError, CatalogResult};
use crate::services::image_lifecycle::ImageLifecycle;
use crate::services::image_path::{extension, plan_path};
use crate::services::main_image::enforce_single_main;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Clone, Debug)]
pub struct NewProductImage {
    pub product_id: i32,
    pub filename: String,
    pub content: Vec<u8>,
    pub cropping: Option<String>,
    pub is_main: bool,
}

/// An empty `cropping` clears the crop box.
#[derive(Clone, Debug, Default)]
pub struct ProductImagePatch {
    pub is_main: Option<bool>,
    pub cropping: Option<String>,
}

/// Stores an uploaded file under the product's slug and records it.
pub async fn add_product_image(
    db: &DatabaseConnection,
    lifecycle: &ImageLifecycle,
    size_limit: usize,
    new: NewProductImage,
) -> CatalogResult<product_image::Model> {
    validate_upload(&new.filename, &new.content, size_limit)?;
    let cropping = normalize_cropping(new.cropping.as_deref())?;

    // read outside the insert transaction: a concurrent slug change can leave
    // this file under the old directory until the next relocation
    let product = product::Entity::find_by_id(new.product_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            CatalogError::NotFound(format!("No product with {} id was found.", new.product_id))
        })?;

    let path = plan_path(&product.slug, &new.filename);
    lifecycle.storage().save(&path, &new.content).await?;

    let model = match insert_image(db, product.id, &path, cropping, new.is_main).await {
        Ok(model) => model,
        Err(err) => {
            if let Err(cleanup) = lifecycle.storage().delete(&path).await {
                tracing::warn!(path = %path, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(err);
        }
    };

    tracing::info!(product_id = product.id, image_id = model.id, path = %model.image, "Product image stored");
    lifecycle.schedule_warm(model.clone()).await?;
    Ok(model)
}

async fn insert_image(
    db: &DatabaseConnection,
    product_id: i32,
    path: &str,
    cropping: Option<String>,
    is_main: bool,
) -> CatalogResult<product_image::Model> {
    let txn = db.begin().await?;
    enforce_single_main(&txn, product_id, is_main, None).await?;
    let model = product_image::ActiveModel {
        product_id: Set(product_id),
        image: Set(path.to_string()),
        cropping: Set(cropping),
        is_main: Set(is_main),
        uploaded_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok(model)
}

pub async fn update_product_image(
    db: &DatabaseConnection,
    lifecycle: &ImageLifecycle,
    id: i32,
    patch: ProductImagePatch,
) -> CatalogResult<product_image::Model> {
    let txn = db.begin().await?;
    let current = find_image(&txn, id).await?;
    let previous_crop = current.cropping.clone();
    let product_id = current.product_id;
    let mut active: product_image::ActiveModel = current.into();

    if let Some(cropping) = patch.cropping.as_deref() {
        active.cropping = Set(normalize_cropping(Some(cropping))?);
    }
    if let Some(is_main) = patch.is_main {
        enforce_single_main(&txn, product_id, is_main, Some(id)).await?;
        active.is_main = Set(is_main);
    }

    let model = active.update(&txn).await?;
    txn.commit().await?;

    if model.cropping != previous_crop {
        lifecycle.invalidate_cache(&model).await?;
    }
    lifecycle.schedule_warm(model.clone()).await?;
    Ok(model)
}

pub async fn delete_product_image(
    db: &DatabaseConnection,
    lifecycle: &ImageLifecycle,
    id: i32,
) -> CatalogResult<()> {
    let image = find_image(db, id).await?;
    product_image::Entity::delete_by_id(id).exec(db).await?;
    lifecycle.discard(&image).await?;
    tracing::info!(image_id = id, path = %image.image, "Product image deleted");
    Ok(())
}

fn validate_upload(filename: &str, content: &[u8], size_limit: usize) -> CatalogResult<()> {
    if content.is_empty() {
        return Err(CatalogError::Validation("Empty file provided".into()));
    }
    if content.len() > size_limit {
        return Err(CatalogError::Validation(format!(
            "File too large. Maximum size is {size_limit} bytes"
        )));
    }

    let ext = extension(filename).to_lowercase();
    if !filename.contains('.') || !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CatalogError::Validation(format!(
            "Unsupported file format '{}'. Supported: {}",
            ext,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    image::guess_format(content)
        .map_err(|_| CatalogError::Validation("Upload is not a recognizable image".into()))?;
    Ok(())
}

fn normalize_cropping(cropping: Option<&str>) -> CatalogResult<Option<String>> {
    match cropping.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<CropBox>()
            .map(|crop| Some(crop.to_string()))
            .map_err(CatalogError::Validation),
    }
}

async fn find_image<C: sea_orm::ConnectionTrait>(
    db: &C,
    id: i32,
) -> CatalogResult<product_image::Model> {
    product_image::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("No image with id {id} was found.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\0";

    #[test]
    fn upload_validation() {
        assert!(validate_upload("a.png", PNG_MAGIC, 1024).is_ok());
        assert!(validate_upload("a.PNG", PNG_MAGIC, 1024).is_ok());
        assert!(validate_upload("a.gif", PNG_MAGIC, 1024).is_err());
        assert!(validate_upload("png", PNG_MAGIC, 1024).is_err());
        assert!(validate_upload("a.png", b"plain text", 1024).is_err());
        assert!(validate_upload("a.png", PNG_MAGIC, 4).is_err());
        assert!(validate_upload("a.png", b"", 1024).is_err());
    }

    #[test]
    fn cropping_is_normalized() {
        assert_eq!(normalize_cropping(None).unwrap(), None);
        assert_eq!(normalize_cropping(Some(" ")).unwrap(), None);
        assert_eq!(
            normalize_cropping(Some("0, 0, 600, 600")).unwrap(),
            Some("0,0,600,600".to_string())
        );
        assert!(normalize_cropping(Some("nope")).is_err());
    }
}
