use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of actor roles.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "shift_engineer")]
    ShiftEngineer,
    #[sea_orm(string_value = "department")]
    Department,
    #[sea_orm(string_value = "oe")]
    Oe,
    #[sea_orm(string_value = "resident_engineer")]
    ResidentEngineer,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ShiftEngineer => "shift_engineer",
            Role::Department => "department",
            Role::Oe => "oe",
            Role::ResidentEngineer => "resident_engineer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
