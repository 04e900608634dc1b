use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A submission accepted by the external workflow system.
///
/// Only routing metadata lives here; the submitted content is the
/// `"{document_id}.json"` artifact written after upload completion.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    /// Document identifier allocated by the external workflow system.
    #[sea_orm(primary_key, auto_increment = false)]
    pub document_id: String,

    pub form_design_id: String,
    pub tenant_id: String,
    /// Submission channel reported by the caller (e.g. "web", "import").
    pub origin: String,
    pub submitted_by: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
