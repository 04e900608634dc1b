use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Value copy of a processor row as of one snapshot.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "history_processor")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub history_id: String,
    #[sea_orm(belongs_to, from = "history_id", to = "id")]
    pub history: HasOne<super::form_design_history::Entity>,

    pub form_version: i32,
    pub email: String,
}

impl ActiveModelBehavior for ActiveModel {}
