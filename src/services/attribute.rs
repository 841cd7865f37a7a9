use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::entities::{
    attribute::{self, ValueType},
    attribute_value, product, product_attribute_value,
};
use crate::error::{CatalogError, CatalogResult};
use crate::services::{assign_slug, require_text};

const NAME_MAX_LEN: usize = 100;
const VALUE_MAX_LEN: usize = 255;

#[derive(Clone, Debug, Default)]
pub struct NewAttribute {
    pub name: String,
    pub value_type: ValueType,
    pub slug: Option<String>,
}

pub async fn create_attribute(
    db: &DatabaseConnection,
    new: NewAttribute,
) -> CatalogResult<attribute::Model> {
    require_text("name", &new.name, NAME_MAX_LEN)?;

    let txn = db.begin().await?;
    let slug = assign_slug::<_, attribute::Entity>(
        &txn,
        attribute::Column::Slug,
        attribute::Column::Id,
        new.slug.as_deref(),
        &new.name,
        None,
    )
    .await?;

    let model = attribute::ActiveModel {
        name: Set(new.name),
        slug: Set(slug),
        value_type: Set(new.value_type),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok(model)
}

/// Adds `value` to the vocabulary of an attribute. Duplicates are conflicts.
pub async fn add_attribute_value(
    db: &DatabaseConnection,
    attribute_id: i32,
    value: String,
) -> CatalogResult<attribute_value::Model> {
    require_text("value", &value, VALUE_MAX_LEN)?;
    find_attribute(db, attribute_id).await?;

    let model = attribute_value::ActiveModel {
        attribute_id: Set(attribute_id),
        value: Set(value),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Writes one line of a product's characteristic sheet, replacing the
/// previous value for the same attribute.
pub async fn set_product_attribute(
    db: &DatabaseConnection,
    product_id: i32,
    attribute_id: i32,
    value: String,
) -> CatalogResult<product_attribute_value::Model> {
    require_text("value", &value, VALUE_MAX_LEN)?;

    let txn = db.begin().await?;
    product::Entity::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("No product with {product_id} id was found.")))?;
    find_attribute(&txn, attribute_id).await?;

    let existing = product_attribute_value::Entity::find()
        .filter(product_attribute_value::Column::ProductId.eq(product_id))
        .filter(product_attribute_value::Column::AttributeId.eq(attribute_id))
        .one(&txn)
        .await?;

    let model = match existing {
        Some(row) => {
            let mut active: product_attribute_value::ActiveModel = row.into();
            active.value = Set(value);
            active.update(&txn).await?
        }
        None => {
            product_attribute_value::ActiveModel {
                product_id: Set(product_id),
                attribute_id: Set(attribute_id),
                value: Set(value),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };
    txn.commit().await?;
    Ok(model)
}

pub async fn remove_product_attribute(
    db: &DatabaseConnection,
    product_id: i32,
    attribute_id: i32,
) -> CatalogResult<bool> {
    let result = product_attribute_value::Entity::delete_many()
        .filter(product_attribute_value::Column::ProductId.eq(product_id))
        .filter(product_attribute_value::Column::AttributeId.eq(attribute_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

async fn find_attribute<C: ConnectionTrait>(db: &C, id: i32) -> CatalogResult<attribute::Model> {
    attribute::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("No attribute with {id} id was found.")))
}
