use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user permitted to edit the owning form design.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "designer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub form_design_id: String,
    #[sea_orm(belongs_to, from = "form_design_id", to = "id")]
    pub form_design: HasOne<super::form_design::Entity>,

    pub email: String,
}

impl ActiveModelBehavior for ActiveModel {}
