use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored secret record. `data` is kept verbatim as JSON.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credentials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    // Set once at creation, never updated.
    pub user_id: i32,
    pub title: String,
    pub platform: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
