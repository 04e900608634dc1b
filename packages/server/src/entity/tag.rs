use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Free-text label shared across form designs.
///
/// Names are case-insensitively unique; uniqueness is enforced at tag
/// resolution time, not by the schema.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(has_many, via = "form_design_tag")]
    pub form_designs: HasMany<super::form_design::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
