use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use serde_json::Value;
use tracing::instrument;

use crate::entity::submission;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::handlers::design::find_design;
use crate::models::design::DesignSpec;
use crate::models::shared::validate_identifier;
use crate::models::submission::{SubmitRequest, SubmitResponse, validate_submit};
use crate::state::AppState;
use crate::upload::orchestrator;
use crate::upload::partition::SubmissionPayload;

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "submit",
    summary = "Submit data against a published form design",
    description = "Runs the three-phase upload protocol against the external workflow system: \
        initiate, stage the index payload and file attachments, complete. On success the \
        merged index artifact is persisted and the external document id returned. A workflow \
        failure aborts the whole attempt; retries restart from initiate with a fresh upload.",
    params(("tenant" = String, Path, description = "Tenant identifier")),
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Submission accepted", body = SubmitResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Design or its artifact not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "External workflow failure (WORKFLOW_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers, payload), fields(tenant))]
pub async fn submit(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    AppJson(payload): AppJson<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_identifier(&tenant, "tenant")?;
    validate_submit(&payload)?;

    let design = find_design(&state.db, &tenant, &payload.form_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Form design '{}' not found", payload.form_id))
        })?;

    // The document definition is the design's current artifact. A row whose
    // blob is gone is a consistency gap and fails closed.
    let text = state
        .artifacts
        .read_text(&design.storage_url)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Artifact for form design '{}' is missing",
                design.id
            ))
        })?;
    let spec: DesignSpec = serde_json::from_str(&text).map_err(|e| {
        AppError::Internal(format!("Corrupt artifact at {}: {e}", design.storage_url))
    })?;

    let bearer = bearer_token(&headers);
    let submitted_by = match bearer {
        Some(token) => state.workflow.current_user(token).await?.email,
        None => "anonymous".to_string(),
    };

    let submission_payload = SubmissionPayload {
        form_id: payload.form_id.clone(),
        tabs: payload.tabs,
    };
    let document_id = orchestrator::upload(
        &state.workflow,
        &*state.artifacts,
        &tenant,
        &submission_payload,
        &spec.fields,
        bearer,
    )
    .await?;

    let record = submission::ActiveModel {
        document_id: Set(document_id),
        form_design_id: Set(design.id),
        tenant_id: Set(tenant),
        origin: Set(payload.origin.trim().to_string()),
        submitted_by: Set(submitted_by),
        created_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            document_id: record.document_id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/{document_id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Read back a submitted document's index content",
    description = "Returns the merged index artifact written after upload completion, file \
        fields included as nested JSON. Missing submissions or missing artifacts are 404.",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("document_id" = String, Path, description = "External document identifier"),
    ),
    responses(
        (status = 200, description = "Submitted index content"),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(tenant, document_id))]
pub async fn get_submission(
    State(state): State<AppState>,
    Path((tenant, document_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    validate_identifier(&tenant, "tenant")?;
    validate_identifier(&document_id, "document_id")?;

    submission::Entity::find_by_id(document_id.clone())
        .filter(submission::Column::TenantId.eq(&tenant))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission '{document_id}' not found")))?;

    let text = state
        .artifacts
        .read_text(&format!("{document_id}.json"))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission '{document_id}' not found")))?;

    let content: Value = serde_json::from_str(&text).map_err(|e| {
        AppError::Internal(format!("Corrupt artifact for document '{document_id}': {e}"))
    })?;

    Ok(Json(content))
}

/// Extract a bearer token from the Authorization header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
