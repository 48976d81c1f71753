use super::LifecycleState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How the fault was reported.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Means {
    #[default]
    #[sea_orm(string_value = "Telephone")]
    Telephone,
    #[sea_orm(string_value = "Email")]
    Email,
    #[sea_orm(string_value = "Radio")]
    Radio,
    #[serde(rename = "In Person")]
    #[sea_orm(string_value = "In Person")]
    InPerson,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(StringLen::N(50))")]
    pub serial_no: String,
    pub fault_date: Date,
    pub fault_time: Time,
    #[sea_orm(column_type = "String(StringLen::N(200))")]
    pub apparatus: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub recommendation: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub operation_action: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub department_action: Option<String>,
    pub notified_by: String,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub refer_to: String,
    pub means: Means,
    pub state: LifecycleState,
    pub created_by: i32,
    pub version: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::remark::Entity")]
    Remarks,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::remark::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Remarks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
