pub mod attribute;
pub mod category;
pub mod identifier;
pub mod image_lifecycle;
pub mod image_path;
pub mod main_image;
pub mod product;
pub mod product_image;
pub mod slug;

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::error::{CatalogError, CatalogResult};
use crate::services::identifier::{resolve_unique_slug, ColumnIndex, IdentifierIndex};
use crate::services::slug::{is_slug, SLUG_MAX_LEN};

/// Slug for a record being written. An empty `requested` slug is generated
/// from `source_text`; anything else must already be normalized and free.
pub(crate) async fn assign_slug<C, E>(
    db: &C,
    column: E::Column,
    pk: E::Column,
    requested: Option<&str>,
    source_text: &str,
    exclude_id: Option<i32>,
) -> CatalogResult<String>
where
    C: ConnectionTrait + Sync,
    E: EntityTrait,
{
    let index = ColumnIndex::<C, E>::new(db, column, pk);
    match requested.map(str::trim).filter(|slug| !slug.is_empty()) {
        None => resolve_unique_slug(&index, source_text, SLUG_MAX_LEN, exclude_id).await,
        Some(slug) => {
            if !is_slug(slug) || slug.chars().count() > SLUG_MAX_LEN {
                return Err(CatalogError::Validation(format!(
                    "`{slug}` is not a valid slug"
                )));
            }
            if index.is_taken(slug, exclude_id).await? {
                return Err(CatalogError::UniqueConflict(format!("slug `{slug}` is taken")));
            }
            Ok(slug.to_string())
        }
    }
}

pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> CatalogResult<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(CatalogError::Validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}
