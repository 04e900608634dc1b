use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_design")]
pub struct Model {
    /// Opaque identifier, stable for the form's lifetime.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub tenant_id: String,
    /// Sequential display number, unique per tenant.
    pub display_id: i32,
    pub name: String,
    pub is_active: bool,
    /// Artifact key of the current version: `"{id}/v{version}.json"`.
    pub storage_url: String,
    /// Count of committed edits; starts at 1, monotonic, never reused.
    pub version: i32,

    #[sea_orm(has_many)]
    pub designers: HasMany<super::designer::Entity>,

    #[sea_orm(has_many)]
    pub processors: HasMany<super::processor::Entity>,

    #[sea_orm(has_many)]
    pub form_states: HasMany<super::form_state::Entity>,

    #[sea_orm(has_many, via = "form_design_tag")]
    pub tags: HasMany<super::tag::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub created_by: String,
}

impl ActiveModelBehavior for ActiveModel {}
