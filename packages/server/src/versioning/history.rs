use chrono::Utc;
use common::ArtifactStore;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::{
    designer, form_design, form_design_history, form_state, history_designer, history_form_state,
    history_processor, processor,
};
use crate::error::AppError;
use crate::models::design::DesignSpec;

/// A history row with its eagerly loaded child collections.
pub struct VersionRecord {
    pub history: form_design_history::Model,
    pub designers: Vec<history_designer::Model>,
    pub processors: Vec<history_processor::Model>,
    pub form_states: Vec<history_form_state::Model>,
}

/// Snapshot a design's state into an append-only history row.
///
/// Must run after the reconciler has applied all version and child changes
/// for the current commit: the version, storage key and children are copied
/// verbatim from the post-commit state. Rows are never updated or deleted by
/// this module.
pub async fn snapshot<C: ConnectionTrait>(
    conn: &C,
    design: &form_design::Model,
    actor_email: &str,
) -> Result<form_design_history::Model, AppError> {
    let now = Utc::now();
    let history = form_design_history::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        form_design_id: Set(design.id.clone()),
        version: Set(design.version),
        name: Set(design.name.clone()),
        storage_url: Set(design.storage_url.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(actor_email.to_string()),
    }
    .insert(conn)
    .await?;

    let designers = designer::Entity::find()
        .filter(designer::Column::FormDesignId.eq(&design.id))
        .all(conn)
        .await?;
    let rows: Vec<history_designer::ActiveModel> = designers
        .iter()
        .map(|d| history_designer::ActiveModel {
            history_id: Set(history.id.clone()),
            form_version: Set(design.version),
            email: Set(d.email.clone()),
            ..Default::default()
        })
        .collect();
    if !rows.is_empty() {
        history_designer::Entity::insert_many(rows).exec(conn).await?;
    }

    let processors = processor::Entity::find()
        .filter(processor::Column::FormDesignId.eq(&design.id))
        .all(conn)
        .await?;
    let rows: Vec<history_processor::ActiveModel> = processors
        .iter()
        .map(|p| history_processor::ActiveModel {
            history_id: Set(history.id.clone()),
            form_version: Set(design.version),
            email: Set(p.email.clone()),
            ..Default::default()
        })
        .collect();
    if !rows.is_empty() {
        history_processor::Entity::insert_many(rows)
            .exec(conn)
            .await?;
    }

    let states = form_state::Entity::find()
        .filter(form_state::Column::FormDesignId.eq(&design.id))
        .all(conn)
        .await?;
    let rows: Vec<history_form_state::ActiveModel> = states
        .iter()
        .map(|s| history_form_state::ActiveModel {
            history_id: Set(history.id.clone()),
            form_version: Set(design.version),
            label: Set(s.label.clone()),
            value: Set(s.value.clone()),
            ..Default::default()
        })
        .collect();
    if !rows.is_empty() {
        history_form_state::Entity::insert_many(rows)
            .exec(conn)
            .await?;
    }

    Ok(history)
}

/// All committed versions of a design, newest first, children included.
pub async fn list_versions(
    db: &DatabaseConnection,
    form_id: &str,
) -> Result<Vec<VersionRecord>, AppError> {
    let rows = form_design_history::Entity::find()
        .filter(form_design_history::Column::FormDesignId.eq(form_id))
        .order_by_desc(form_design_history::Column::Version)
        .all(db)
        .await?;

    let mut records = Vec::with_capacity(rows.len());
    for history in rows {
        records.push(load_children(db, history).await?);
    }
    Ok(records)
}

/// One committed version of a design, or not-found.
pub async fn get_version(
    db: &DatabaseConnection,
    form_id: &str,
    version: i32,
) -> Result<VersionRecord, AppError> {
    let history = form_design_history::Entity::find()
        .filter(form_design_history::Column::FormDesignId.eq(form_id))
        .filter(form_design_history::Column::Version.eq(version))
        .one(db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Version {version} of form design '{form_id}' not found"
            ))
        })?;

    load_children(db, history).await
}

async fn load_children(
    db: &DatabaseConnection,
    history: form_design_history::Model,
) -> Result<VersionRecord, AppError> {
    let designers = history_designer::Entity::find()
        .filter(history_designer::Column::HistoryId.eq(&history.id))
        .all(db)
        .await?;
    let processors = history_processor::Entity::find()
        .filter(history_processor::Column::HistoryId.eq(&history.id))
        .all(db)
        .await?;
    let form_states = history_form_state::Entity::find()
        .filter(history_form_state::Column::HistoryId.eq(&history.id))
        .all(db)
        .await?;

    Ok(VersionRecord {
        history,
        designers,
        processors,
        form_states,
    })
}

/// Resolve a version's artifact into the field specification it archived.
///
/// A relational row whose blob is gone is a consistency gap; it surfaces as
/// not-found, never as fabricated empty content.
pub async fn read_payload(
    artifacts: &dyn ArtifactStore,
    history: &form_design_history::Model,
) -> Result<DesignSpec, AppError> {
    let text = artifacts
        .read_text(&history.storage_url)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Artifact for version {} of form design '{}' is missing",
                history.version, history.form_design_id
            ))
        })?;

    serde_json::from_str(&text).map_err(|e| {
        AppError::Internal(format!(
            "Corrupt artifact at {}: {e}",
            history.storage_url
        ))
    })
}
