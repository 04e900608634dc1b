use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::ArtifactStore;
use serde_json::Value;

use crate::error::AppError;
use crate::models::design::FieldSpec;
use crate::upload::client::WorkflowClient;
use crate::upload::partition::{Partitioned, SubmissionPayload, partition};

/// Reserved additional-data key for the file-stripped index payload.
pub const FORM_DATA_KEY: &str = "formData";

/// Run the three-phase upload protocol for one submission.
///
/// Initiate reserves a slot, staging uploads the index payload and every
/// file attachment, complete finalizes and yields the document id. Staging
/// must fully finish before complete runs. The merged status artifact at
/// `"{document_id}.json"` is written exactly once, after completion; the
/// document id does not exist earlier.
pub async fn upload(
    client: &WorkflowClient,
    artifacts: &dyn ArtifactStore,
    tenant: &str,
    payload: &SubmissionPayload,
    fields: &[FieldSpec],
    bearer: Option<&str>,
) -> Result<String, AppError> {
    let parts = partition(payload, fields);

    let upload_id = client
        .initiate_upload(tenant, &payload.form_id, bearer)
        .await?;

    if let Err(err) = stage(client, tenant, &upload_id, &parts, fields, bearer).await {
        // The reserved slot is abandoned, not released; the external system
        // exposes no cleanup call. Log the id so leaked slots are traceable.
        tracing::warn!("Abandoning upload '{upload_id}' after staging failure");
        return Err(err);
    }

    let document_id = client.complete_upload(tenant, &upload_id, bearer).await?;

    // The full index, file fields included as nested JSON. This artifact is
    // what submission-status lookups read back.
    let mut merged = parts.index_fields_with_files;
    merged.insert(
        "formId".to_string(),
        Value::String(payload.form_id.clone()),
    );
    artifacts
        .write_bytes(
            &format!("{document_id}.json"),
            &serde_json::to_vec(&Value::Object(merged))?,
        )
        .await?;

    Ok(document_id)
}

/// Phase 2: the index payload uploads under the reserved `formData` key,
/// then every file field stages as its own binary attachment. Uploads run
/// sequentially; each targets a distinct signed URL.
async fn stage(
    client: &WorkflowClient,
    tenant: &str,
    upload_id: &str,
    parts: &Partitioned,
    fields: &[FieldSpec],
    bearer: Option<&str>,
) -> Result<(), AppError> {
    let index_bytes = serde_json::to_vec(&Value::Object(parts.index_fields.clone()))?;
    let url = client
        .file_upload_url(tenant, upload_id, FORM_DATA_KEY, "formData.json", bearer)
        .await?;
    client.put_file(&url, index_bytes).await?;

    for field in fields.iter().filter(|f| f.is_file()) {
        let Some(value) = parts.index_fields_with_files.get(&field.name) else {
            continue;
        };
        let attachment = decode_attachment(&field.name, value)?;
        let url = client
            .file_upload_url(tenant, upload_id, &field.name, &attachment.file_name, bearer)
            .await?;
        client.put_file(&url, attachment.bytes).await?;
    }

    Ok(())
}

struct Attachment {
    file_name: String,
    bytes: Vec<u8>,
}

/// Decode a file field value of the shape
/// `{ "base64File": "data:image/png;base64,<data>", "name": "id.png" }`.
/// Everything up to and including the first comma is a data-URI prefix and
/// is stripped before decoding.
fn decode_attachment(field_name: &str, value: &Value) -> Result<Attachment, AppError> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::Validation(format!("File field '{field_name}' must be an object"))
    })?;
    let raw = obj
        .get("base64File")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::Validation(format!("File field '{field_name}' is missing 'base64File'"))
        })?;
    let file_name = obj
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(field_name)
        .to_string();

    let encoded = raw.split_once(',').map(|(_, rest)| rest).unwrap_or(raw);
    let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
        AppError::Validation(format!("File field '{field_name}' is not valid base64: {e}"))
    })?;

    Ok(Attachment { file_name, bytes })
}
