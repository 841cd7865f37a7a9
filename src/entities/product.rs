use sea_orm::entity::prelude::*;
use serde::Serialize;
use crate::entities::category::Entity as Category;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub title: String,
    #[sea_orm(unique, column_type = "String(StringLen::N(50))")]
    pub slug: String,
    #[sea_orm(indexed)]
    pub category_id: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(unique, column_type = "String(StringLen::N(100))")]
    pub sku: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Category",
        from = "crate::entities::product::Column::CategoryId",
        to = "crate::entities::category::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict",
    )]
    Category,
    #[sea_orm(has_many = "crate::entities::product_image::Entity")]
    ProductImage,
    #[sea_orm(has_many = "crate::entities::product_attribute_value::Entity")]
    ProductAttributeValue,
}

impl Related<crate::entities::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<crate::entities::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductImage.def()
    }
}

impl Related<crate::entities::product_attribute_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductAttributeValue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
