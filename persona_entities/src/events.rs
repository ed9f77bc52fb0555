use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    pub from_type: String,
    pub from_id: String,
    pub to_type: String,
    pub to_id: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    /// Microseconds since the Unix epoch. Integer so ordering is exact on
    /// every backend.
    pub timestamp_us: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
