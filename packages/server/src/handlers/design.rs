use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{
    designer, form_design, form_design_history, form_design_tag, form_state, history_designer,
    history_form_state, history_processor, processor, tag,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::actor::ActorEmail;
use crate::extractors::json::AppJson;
use crate::models::design::*;
use crate::models::shared::validate_identifier;
use crate::state::AppState;
use crate::versioning::reconciler;

#[utoipa::path(
    post,
    path = "/",
    tag = "Designs",
    operation_id = "saveDesign",
    summary = "Create or update a form design",
    description = "Commits a field specification as the next version of a form design. \
        Without `form_id` (or when the given id does not exist yet) a new design is created \
        at version 1; otherwise the existing design's version is incremented in place. \
        Returns the design summary with a short-lived signed URL for the new artifact.",
    params(("tenant" = String, Path, description = "Tenant identifier")),
    request_body = SaveDesignRequest,
    responses(
        (status = 201, description = "Design created", body = DesignResponse),
        (status = 200, description = "Design updated", body = DesignResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Concurrent edit lost the version race (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, actor, payload), fields(tenant))]
pub async fn save_design(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    ActorEmail(actor): ActorEmail,
    AppJson(payload): AppJson<SaveDesignRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_identifier(&tenant, "tenant")?;
    validate_save_design(&payload)?;

    let existing = match payload.form_id {
        Some(ref form_id) => {
            let found = find_design(&state.db, &tenant, form_id).await?;
            if found.is_none() {
                // An id that resolves to nothing falls into the create
                // branch, keeping the given id (import/restore path).
                tracing::debug!("Design '{form_id}' not found for tenant '{tenant}', creating");
            }
            found
        }
        None => None,
    };

    let committed = reconciler::commit(
        &state.db,
        &*state.artifacts,
        payload.spec,
        existing,
        payload.form_id,
        &tenant,
        &actor,
        state.artifact_url_ttl(),
    )
    .await?;

    let status = if committed.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = design_response(&state.db, committed.design, committed.artifact_url).await?;

    Ok((status, Json(body)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Designs",
    operation_id = "listDesigns",
    summary = "List a tenant's form designs",
    params(("tenant" = String, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Design summaries", body = Vec<DesignListItem>),
    ),
)]
#[instrument(skip(state), fields(tenant))]
pub async fn list_designs(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<Vec<DesignListItem>>, AppError> {
    validate_identifier(&tenant, "tenant")?;

    let designs = form_design::Entity::find()
        .filter(form_design::Column::TenantId.eq(&tenant))
        .order_by_asc(form_design::Column::DisplayId)
        .all(&state.db)
        .await?;

    Ok(Json(designs.into_iter().map(DesignListItem::from).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Designs",
    operation_id = "getDesign",
    summary = "Get a form design",
    description = "Returns the design summary with its child collections and a fresh signed \
        artifact URL for the current version.",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("id" = String, Path, description = "Form design ID"),
    ),
    responses(
        (status = 200, description = "Design details", body = DesignResponse),
        (status = 404, description = "Design not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(tenant, id))]
pub async fn get_design(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<Json<DesignResponse>, AppError> {
    validate_identifier(&tenant, "tenant")?;

    let design = find_design(&state.db, &tenant, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form design '{id}' not found")))?;

    let artifact_url = state
        .artifacts
        .signed_read_url(&design.storage_url, state.artifact_url_ttl())?;

    Ok(Json(design_response(&state.db, design, artifact_url).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Designs",
    operation_id = "deleteDesign",
    summary = "Delete a form design",
    description = "Permanently removes the design, its children, its version history and every \
        artifact under its storage prefix. Tags are shared and survive; submission records are \
        kept for audit.",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("id" = String, Path, description = "Form design ID"),
    ),
    responses(
        (status = 204, description = "Design deleted"),
        (status = 404, description = "Design not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(tenant, id))]
pub async fn delete_design(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    validate_identifier(&tenant, "tenant")?;

    let txn = state.db.begin().await?;

    let design = form_design::Entity::find_by_id(id.clone())
        .filter(form_design::Column::TenantId.eq(&tenant))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form design '{id}' not found")))?;

    let history_ids: Vec<String> = form_design_history::Entity::find()
        .filter(form_design_history::Column::FormDesignId.eq(&design.id))
        .select_only()
        .column(form_design_history::Column::Id)
        .into_tuple::<String>()
        .all(&txn)
        .await?;

    if !history_ids.is_empty() {
        history_designer::Entity::delete_many()
            .filter(history_designer::Column::HistoryId.is_in(history_ids.clone()))
            .exec(&txn)
            .await?;
        history_processor::Entity::delete_many()
            .filter(history_processor::Column::HistoryId.is_in(history_ids.clone()))
            .exec(&txn)
            .await?;
        history_form_state::Entity::delete_many()
            .filter(history_form_state::Column::HistoryId.is_in(history_ids))
            .exec(&txn)
            .await?;
    }
    form_design_history::Entity::delete_many()
        .filter(form_design_history::Column::FormDesignId.eq(&design.id))
        .exec(&txn)
        .await?;

    designer::Entity::delete_many()
        .filter(designer::Column::FormDesignId.eq(&design.id))
        .exec(&txn)
        .await?;
    processor::Entity::delete_many()
        .filter(processor::Column::FormDesignId.eq(&design.id))
        .exec(&txn)
        .await?;
    form_state::Entity::delete_many()
        .filter(form_state::Column::FormDesignId.eq(&design.id))
        .exec(&txn)
        .await?;
    form_design_tag::Entity::delete_many()
        .filter(form_design_tag::Column::FormDesignId.eq(&design.id))
        .exec(&txn)
        .await?;

    form_design::Entity::delete_by_id(design.id.clone())
        .exec(&txn)
        .await?;
    txn.commit().await?;

    // Blob cleanup runs after the relational delete; every version's
    // artifact lives under the design's prefix.
    state.artifacts.delete_prefix(&format!("{}/", design.id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_design<C: ConnectionTrait>(
    db: &C,
    tenant: &str,
    id: &str,
) -> Result<Option<form_design::Model>, AppError> {
    Ok(form_design::Entity::find_by_id(id.to_string())
        .filter(form_design::Column::TenantId.eq(tenant))
        .one(db)
        .await?)
}

/// Assemble the full design response: children, tag names, signed URL.
async fn design_response(
    db: &DatabaseConnection,
    design: form_design::Model,
    artifact_url: String,
) -> Result<DesignResponse, AppError> {
    let designers: Vec<String> = designer::Entity::find()
        .filter(designer::Column::FormDesignId.eq(&design.id))
        .all(db)
        .await?
        .into_iter()
        .map(|d| d.email)
        .collect();

    let processors: Vec<String> = processor::Entity::find()
        .filter(processor::Column::FormDesignId.eq(&design.id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.email)
        .collect();

    let form_states: Vec<FormStateSpec> = form_state::Entity::find()
        .filter(form_state::Column::FormDesignId.eq(&design.id))
        .all(db)
        .await?
        .into_iter()
        .map(|s| FormStateSpec {
            label: s.label,
            value: s.value,
        })
        .collect();

    let tag_ids: Vec<i32> = form_design_tag::Entity::find()
        .filter(form_design_tag::Column::FormDesignId.eq(&design.id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.tag_id)
        .collect();
    let mut tags: Vec<String> = if tag_ids.is_empty() {
        Vec::new()
    } else {
        tag::Entity::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect()
    };
    tags.sort();

    Ok(DesignResponse {
        id: design.id,
        display_id: design.display_id,
        name: design.name,
        version: design.version,
        is_active: design.is_active,
        designers,
        processors,
        form_states,
        tags,
        artifact_url,
        created_at: design.created_at,
        updated_at: design.updated_at,
        created_by: design.created_by,
    })
}
