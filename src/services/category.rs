use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use std::collections::HashSet;

use crate::entities::{category, product};
use crate::error::{CatalogError, CatalogResult};
use crate::services::{assign_slug, require_text};

pub const TITLE_MAX_LEN: usize = 100;

#[derive(Clone, Debug, Default)]
pub struct NewCategory {
    pub title: String,
    pub parent_id: Option<i32>,
    pub slug: Option<String>,
}

/// `parent_id: Some(None)` detaches the category from its parent.
#[derive(Clone, Debug, Default)]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub parent_id: Option<Option<i32>>,
}

pub async fn create_category(
    db: &DatabaseConnection,
    new: NewCategory,
) -> CatalogResult<category::Model> {
    require_text("title", &new.title, TITLE_MAX_LEN)?;

    let txn = db.begin().await?;
    if let Some(parent_id) = new.parent_id {
        find(&txn, parent_id).await?;
    }

    let slug = assign_slug::<_, category::Entity>(
        &txn,
        category::Column::Slug,
        category::Column::Id,
        new.slug.as_deref(),
        &new.title,
        None,
    )
    .await?;

    let model = category::ActiveModel {
        title: Set(new.title),
        parent_id: Set(new.parent_id),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(category_id = model.id, slug = %model.slug, "Category created");
    Ok(model)
}

/// Title and parent may change; the slug never does once assigned.
pub async fn update_category(
    db: &DatabaseConnection,
    id: i32,
    patch: CategoryPatch,
) -> CatalogResult<category::Model> {
    let txn = db.begin().await?;
    let current = find(&txn, id).await?;
    let mut active: category::ActiveModel = current.into();

    if let Some(title) = patch.title {
        require_text("title", &title, TITLE_MAX_LEN)?;
        active.title = Set(title);
    }

    if let Some(parent_id) = patch.parent_id {
        if let Some(parent_id) = parent_id {
            find(&txn, parent_id).await?;
            if subtree_ids(&txn, id).await?.contains(&parent_id) {
                return Err(CatalogError::Validation(
                    "A category cannot be nested under itself or its descendants".into(),
                ));
            }
        }
        active.parent_id = Set(parent_id);
    }

    let model = active.update(&txn).await?;
    txn.commit().await?;
    Ok(model)
}

/// Deletes the category with all of its descendants. Refused while any
/// product sits anywhere in that subtree.
pub async fn delete_category(db: &DatabaseConnection, id: i32) -> CatalogResult<u64> {
    let txn = db.begin().await?;
    find(&txn, id).await?;

    let subtree: Vec<i32> = subtree_ids(&txn, id).await?.into_iter().collect();
    let products = product::Entity::find()
        .filter(product::Column::CategoryId.is_in(subtree.clone()))
        .count(&txn)
        .await?;
    if products > 0 {
        return Err(CatalogError::Protected(format!(
            "Category {id} is referenced by {products} product(s)"
        )));
    }

    let result = category::Entity::delete_many()
        .filter(category::Column::Id.is_in(subtree))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!(category_id = id, deleted = result.rows_affected, "Category deleted");
    Ok(result.rows_affected)
}

async fn find<C: sea_orm::ConnectionTrait>(db: &C, id: i32) -> CatalogResult<category::Model> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("No category with {id} id was found.")))
}

/// `id` plus every category below it.
async fn subtree_ids<C: sea_orm::ConnectionTrait>(db: &C, id: i32) -> CatalogResult<HashSet<i32>> {
    let mut seen = HashSet::from([id]);
    let mut frontier = vec![id];

    while !frontier.is_empty() {
        let children = category::Entity::find()
            .filter(category::Column::ParentId.is_in(frontier))
            .all(db)
            .await?;
        frontier = children
            .into_iter()
            .map(|child| child.id)
            .filter(|child_id| seen.insert(*child_id))
            .collect();
    }
    Ok(seen)
}
