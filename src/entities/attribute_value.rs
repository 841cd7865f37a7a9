use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attribute_value")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub attribute_id: i32,
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::attribute::Entity",
        from = "Column::AttributeId",
        to = "crate::entities::attribute::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Attribute,
}

impl Related<crate::entities::attribute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attribute.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
