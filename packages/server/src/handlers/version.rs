use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::handlers::design::find_design;
use crate::models::design::{DesignSpec, FormStateSpec, VersionSummary};
use crate::models::shared::validate_identifier;
use crate::state::AppState;
use crate::versioning::history;

#[utoipa::path(
    get,
    path = "/",
    tag = "Versions",
    operation_id = "listVersions",
    summary = "List a design's committed versions",
    description = "Returns every committed version of the design, newest first, with the \
        designer/processor/form-state membership snapshotted at each version.",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("id" = String, Path, description = "Form design ID"),
    ),
    responses(
        (status = 200, description = "Version history", body = Vec<VersionSummary>),
        (status = 404, description = "Design not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(tenant, id))]
pub async fn list_versions(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<Json<Vec<VersionSummary>>, AppError> {
    validate_identifier(&tenant, "tenant")?;

    find_design(&state.db, &tenant, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form design '{id}' not found")))?;

    let records = history::list_versions(&state.db, &id).await?;
    let summaries = records
        .into_iter()
        .map(|record| VersionSummary {
            version: record.history.version,
            name: record.history.name,
            designers: record.designers.into_iter().map(|d| d.email).collect(),
            processors: record.processors.into_iter().map(|p| p.email).collect(),
            form_states: record
                .form_states
                .into_iter()
                .map(|s| FormStateSpec {
                    label: s.label,
                    value: s.value,
                })
                .collect(),
            created_at: record.history.created_at,
            created_by: record.history.created_by,
        })
        .collect();

    Ok(Json(summaries))
}

#[utoipa::path(
    get,
    path = "/{version}",
    tag = "Versions",
    operation_id = "getVersion",
    summary = "Retrieve the field specification archived at a version",
    description = "Resolves the version's artifact and returns the field specification it \
        archived, field ids included, ready to be committed again as a restore. A missing \
        history row or missing artifact is a 404, never empty content.",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("id" = String, Path, description = "Form design ID"),
        ("version" = i32, Path, description = "Version number"),
    ),
    responses(
        (status = 200, description = "Archived field specification", body = DesignSpec),
        (status = 404, description = "Design, version or artifact not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(tenant, id, version))]
pub async fn get_version(
    State(state): State<AppState>,
    Path((tenant, id, version)): Path<(String, String, i32)>,
) -> Result<Json<DesignSpec>, AppError> {
    validate_identifier(&tenant, "tenant")?;

    find_design(&state.db, &tenant, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form design '{id}' not found")))?;

    let record = history::get_version(&state.db, &id, version).await?;
    let spec = history::read_payload(&*state.artifacts, &record.history).await?;

    Ok(Json(spec))
}
