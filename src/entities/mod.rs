pub mod attribute;
pub mod attribute_value;
pub mod category;
pub mod product;
pub mod product_attribute_value;
pub mod product_image;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use crate::entities::{
    attribute::Entity as Attribute,
    attribute_value::Entity as AttributeValue,
    category::Entity as Category,
    product::Entity as Product,
    product_attribute_value::Entity as ProductAttributeValue,
    product_image::Entity as ProductImage,
};

pub async fn setup_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    create_table(db, Category).await?;
    create_table(db, Attribute).await?;
    create_table(db, Product).await?;
    create_table(db, AttributeValue).await?;
    create_table(db, ProductImage).await?;
    create_table(db, ProductAttributeValue).await?;

    let backend = db.get_database_backend();
    let attribute_value_pair = Index::create()
        .name("idx_attribute_value_pair")
        .table(AttributeValue)
        .col(attribute_value::Column::AttributeId)
        .col(attribute_value::Column::Value)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&attribute_value_pair)).await?;

    let product_attribute_pair = Index::create()
        .name("idx_product_attribute_value_pair")
        .table(ProductAttributeValue)
        .col(product_attribute_value::Column::ProductId)
        .col(product_attribute_value::Column::AttributeId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&product_attribute_pair)).await?;

    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }
    Ok(())
}
