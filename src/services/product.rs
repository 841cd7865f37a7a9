use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::entities::{category, product, product_attribute_value, product_image};
use crate::error::{CatalogError, CatalogResult};
use crate::services::identifier::{generate_unique_sku, ColumnIndex};
use crate::services::image_lifecycle::ImageLifecycle;
use crate::services::{assign_slug, require_text};

pub const TITLE_MAX_LEN: usize = 255;
pub const SKU_MAX_LEN: usize = 100;

/// Attempts at creating a product whose identifiers were generated, before a
/// unique-constraint conflict is handed to the caller.
pub const CONFLICT_RETRIES: u32 = 3;

const PRICE_SCALE: u32 = 2;
const PRICE_MAX_DIGITS: u32 = 10;

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub title: String,
    pub category_id: i32,
    pub description: String,
    pub price: Decimal,
    pub slug: Option<String>,
    pub sku: Option<String>,
}

/// An empty `slug` or `sku` asks for a freshly generated one.
#[derive(Clone, Debug, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub sku: Option<String>,
}

pub async fn create_product(
    db: &DatabaseConnection,
    new: NewProduct,
) -> CatalogResult<product::Model> {
    require_text("title", &new.title, TITLE_MAX_LEN)?;
    let price = validate_price(new.price)?;
    let generated = blank(&new.slug) || blank(&new.sku);

    let mut attempt = 1;
    loop {
        match try_create(db, &new, price).await {
            Err(err) if err.is_retryable() && generated && attempt < CONFLICT_RETRIES => {
                tracing::warn!(attempt, error = %err, "Identifier conflict on product insert, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

async fn try_create(
    db: &DatabaseConnection,
    new: &NewProduct,
    price: Decimal,
) -> CatalogResult<product::Model> {
    let txn = db.begin().await?;
    find_category(&txn, new.category_id).await?;

    let slug = assign_slug::<_, product::Entity>(
        &txn,
        product::Column::Slug,
        product::Column::Id,
        new.slug.as_deref(),
        &new.title,
        None,
    )
    .await?;
    let sku = assign_sku(&txn, new.sku.as_deref()).await?;

    let model = product::ActiveModel {
        title: Set(new.title.clone()),
        slug: Set(slug),
        category_id: Set(new.category_id),
        description: Set(new.description.clone()),
        sku: Set(sku),
        price: Set(price),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    let model = with_fixed_price(model);

    tracing::info!(product_id = model.id, slug = %model.slug, sku = %model.sku, "Product created");
    Ok(model)
}

/// Applies `patch`. When the slug ends up different, every image of the
/// product is moved under the new slug after the product row is committed.
pub async fn update_product(
    db: &DatabaseConnection,
    lifecycle: &ImageLifecycle,
    id: i32,
    patch: ProductPatch,
) -> CatalogResult<product::Model> {
    let txn = db.begin().await?;
    let current = find_product(&txn, id).await?;
    let old_slug = current.slug.clone();
    let mut title = current.title.clone();
    let mut active: product::ActiveModel = current.into();

    if let Some(new_title) = patch.title {
        require_text("title", &new_title, TITLE_MAX_LEN)?;
        title = new_title.clone();
        active.title = Set(new_title);
    }
    if let Some(category_id) = patch.category_id {
        find_category(&txn, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(price) = patch.price {
        active.price = Set(validate_price(price)?);
    }
    if let Some(requested) = patch.slug.as_deref() {
        if requested != old_slug {
            let slug = assign_slug::<_, product::Entity>(
                &txn,
                product::Column::Slug,
                product::Column::Id,
                Some(requested),
                &title,
                Some(id),
            )
            .await?;
            active.slug = Set(slug);
        }
    }
    if let Some(requested) = patch.sku.as_deref() {
        let sku = assign_sku(&txn, Some(requested)).await?;
        active.sku = Set(sku);
    }

    let model = with_fixed_price(active.update(&txn).await?);
    txn.commit().await?;

    if model.slug != old_slug {
        tracing::info!(product_id = id, old_slug = %old_slug, new_slug = %model.slug, "Product slug changed");
        lifecycle.relocate_images(db, id, &model.slug).await?;
    }
    Ok(model)
}

/// Deletes the product with its images and characteristic sheet, then
/// removes the image files.
pub async fn delete_product(
    db: &DatabaseConnection,
    lifecycle: &ImageLifecycle,
    id: i32,
) -> CatalogResult<()> {
    let txn = db.begin().await?;
    find_product(&txn, id).await?;

    let images = product_image::Entity::find()
        .filter(product_image::Column::ProductId.eq(id))
        .all(&txn)
        .await?;
    product_image::Entity::delete_many()
        .filter(product_image::Column::ProductId.eq(id))
        .exec(&txn)
        .await?;
    product_attribute_value::Entity::delete_many()
        .filter(product_attribute_value::Column::ProductId.eq(id))
        .exec(&txn)
        .await?;
    product::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    for image in &images {
        lifecycle.discard(image).await?;
    }
    tracing::info!(product_id = id, images = images.len(), "Product deleted");
    Ok(())
}

async fn assign_sku<C>(db: &C, requested: Option<&str>) -> CatalogResult<String>
where
    C: ConnectionTrait + Sync,
{
    match requested.map(str::trim).filter(|sku| !sku.is_empty()) {
        Some(sku) => {
            require_text("sku", sku, SKU_MAX_LEN)?;
            Ok(sku.to_string())
        }
        None => {
            let index = ColumnIndex::<C, product::Entity>::new(
                db,
                product::Column::Sku,
                product::Column::Id,
            );
            let mut rng = StdRng::from_entropy();
            generate_unique_sku(&index, &mut rng).await
        }
    }
}

/// Price at its stored scale of two fractional digits.
pub fn fixed_price(mut price: Decimal) -> Decimal {
    price.rescale(PRICE_SCALE);
    price
}

fn with_fixed_price(mut model: product::Model) -> product::Model {
    model.price = fixed_price(model.price);
    model
}

/// Checks precision and range; returns the price at the stored scale.
fn validate_price(price: Decimal) -> CatalogResult<Decimal> {
    let normalized = price.normalize();
    if normalized.scale() > PRICE_SCALE {
        return Err(CatalogError::Validation(format!(
            "price must have at most {PRICE_SCALE} decimal places"
        )));
    }
    let limit = Decimal::from(10i64.pow(PRICE_MAX_DIGITS - PRICE_SCALE));
    if normalized.abs() >= limit {
        return Err(CatalogError::Validation(format!(
            "price must have at most {PRICE_MAX_DIGITS} digits"
        )));
    }
    Ok(fixed_price(normalized))
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

async fn find_product<C: ConnectionTrait>(db: &C, id: i32) -> CatalogResult<product::Model> {
    product::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("No product with {id} id was found.")))
}

async fn find_category<C: ConnectionTrait>(db: &C, id: i32) -> CatalogResult<category::Model> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("No category with {id} id was found.")))
}
