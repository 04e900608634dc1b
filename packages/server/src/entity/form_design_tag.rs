use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_design_tag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub form_design_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag_id: i32,

    #[sea_orm(belongs_to, from = "form_design_id", to = "id")]
    pub form_design: HasOne<super::form_design::Entity>,
    #[sea_orm(belongs_to, from = "tag_id", to = "id")]
    pub tag: HasOne<super::tag::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
