use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attribute")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(StringLen::N(100))")]
    pub name: String,
    #[sea_orm(unique, column_type = "String(StringLen::N(50))")]
    pub slug: String,
    pub value_type: ValueType,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::entities::attribute_value::Entity")]
    AttributeValue,
}

impl Related<crate::entities::attribute_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttributeValue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Declared type of an attribute's values. Not enforced on stored values.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    enum_name = "value_type_enum",
    db_type = "String(StringLen::N(10))",
    rs_type = "String"
)]
pub enum ValueType {
    #[default]
    #[sea_orm(string_value = "str")]
    #[serde(rename = "str")]
    Str,
    #[sea_orm(string_value = "int")]
    #[serde(rename = "int")]
    Int,
    #[sea_orm(string_value = "decimal")]
    #[serde(rename = "decimal")]
    Decimal,
    #[sea_orm(string_value = "bool")]
    #[serde(rename = "bool")]
    Bool,
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(Self::Str),
            "int" => Ok(Self::Int),
            "decimal" => Ok(Self::Decimal),
            "bool" => Ok(Self::Bool),
            _ => Err(format!("Invalid value type: {}", s)),
        }
    }
}
