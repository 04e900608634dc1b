use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{validate_email, validate_identifier, validate_name};

/// The full field specification submitted by the design UI.
///
/// This is also the artifact payload: each committed version serializes one
/// `DesignSpec` (with field ids assigned) to `"{id}/v{version}.json"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DesignSpec {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub designers: Vec<String>,
    #[serde(default)]
    pub processors: Vec<String>,
    #[serde(default)]
    pub form_states: Vec<FormStateSpec>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldSpec {
    /// Assigned on commit if absent; never regenerated once present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Declared datatype; `"file"` marks an attachment field.
    pub datatype: String,
    /// Tab/group the field's value lives under in submission payloads.
    #[serde(default)]
    pub tab: String,
    /// Primitive type derived from `datatype` on commit. Advisory metadata.
    #[serde(default)]
    pub field_type: String,
}

impl FieldSpec {
    pub fn is_file(&self) -> bool {
        self.datatype.eq_ignore_ascii_case("file")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FormStateSpec {
    pub label: String,
    pub value: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SaveDesignRequest {
    /// Existing design to update, or an explicit id for import/restore.
    /// Absent: a fresh identifier is allocated.
    pub form_id: Option<String>,
    pub spec: DesignSpec,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DesignResponse {
    pub id: String,
    pub display_id: i32,
    pub name: String,
    pub version: i32,
    pub is_active: bool,
    pub designers: Vec<String>,
    pub processors: Vec<String>,
    pub form_states: Vec<FormStateSpec>,
    pub tags: Vec<String>,
    /// Short-lived signed read URL for the current version's artifact.
    pub artifact_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DesignListItem {
    pub id: String,
    pub display_id: i32,
    pub name: String,
    pub version: i32,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::form_design::Model> for DesignListItem {
    fn from(m: crate::entity::form_design::Model) -> Self {
        Self {
            id: m.id,
            display_id: m.display_id,
            name: m.name,
            version: m.version,
            is_active: m.is_active,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionSummary {
    pub version: i32,
    pub name: String,
    pub designers: Vec<String>,
    pub processors: Vec<String>,
    pub form_states: Vec<FormStateSpec>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

pub fn validate_save_design(req: &SaveDesignRequest) -> Result<(), AppError> {
    if let Some(ref form_id) = req.form_id {
        validate_identifier(form_id, "form_id")?;
    }
    validate_name(&req.spec.name)?;
    for field in &req.spec.fields {
        if field.name.trim().is_empty() {
            return Err(AppError::Validation("Field names must not be empty".into()));
        }
    }
    for email in req.spec.designers.iter().chain(&req.spec.processors) {
        validate_email(email)?;
    }
    Ok(())
}
