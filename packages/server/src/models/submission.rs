use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

use super::shared::validate_identifier;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitRequest {
    /// Identifier of the published form design being submitted against.
    pub form_id: String,
    /// Submission channel (e.g. "web", "import").
    pub origin: String,
    /// Per-tab field values, keyed by tab name then field name.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub tabs: serde_json::Map<String, Value>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    /// Document identifier allocated by the external workflow system.
    pub document_id: String,
}

pub fn validate_submit(req: &SubmitRequest) -> Result<(), AppError> {
    validate_identifier(&req.form_id, "form_id")?;
    let origin = req.origin.trim();
    if origin.is_empty() || origin.len() > 64 {
        return Err(AppError::Validation("Origin must be 1-64 characters".into()));
    }
    Ok(())
}
