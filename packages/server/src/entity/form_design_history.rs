use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only snapshot of a form design as of one committed version.
///
/// Rows are inserted at the end of every successful commit and never
/// mutated or deleted afterwards (except when the owning design is
/// deleted outright).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_design_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub form_design_id: String,
    #[sea_orm(belongs_to, from = "form_design_id", to = "id")]
    pub form_design: HasOne<super::form_design::Entity>,

    /// The version this row snapshots; `(form_design_id, version)` is unique.
    pub version: i32,
    pub name: String,
    /// Artifact key in effect at this version.
    pub storage_url: String,

    #[sea_orm(has_many)]
    pub designers: HasMany<super::history_designer::Entity>,

    #[sea_orm(has_many)]
    pub processors: HasMany<super::history_processor::Entity>,

    #[sea_orm(has_many)]
    pub form_states: HasMany<super::history_form_state::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub created_by: String,
}

impl ActiveModelBehavior for ActiveModel {}
