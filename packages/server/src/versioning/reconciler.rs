use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use common::ArtifactStore;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::Func;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::{designer, form_design, form_design_tag, form_state, processor, tag};
use crate::error::AppError;
use crate::models::design::{DesignSpec, FieldSpec, FormStateSpec};
use crate::versioning::history;

/// Result of committing a field specification.
pub struct CommittedDesign {
    pub design: form_design::Model,
    /// Short-lived signed read URL for the new version's artifact. The raw
    /// storage key is never handed to callers.
    pub artifact_url: String,
    pub created: bool,
}

/// Commit a field specification as the next version of a form design.
///
/// `existing` decides the branch: `None` creates version 1 (a lookup that
/// found nothing lands here too), `Some` increments the version in place.
/// Commit order is artifact write, then the guarded relational commit with
/// its history snapshot in one transaction. An artifact orphaned by a failed
/// relational commit is accepted garbage; the reverse (a committed row
/// without its artifact) cannot happen.
pub async fn commit(
    db: &DatabaseConnection,
    artifacts: &dyn ArtifactStore,
    mut spec: DesignSpec,
    existing: Option<form_design::Model>,
    requested_id: Option<String>,
    tenant_id: &str,
    actor_email: &str,
    url_ttl: Duration,
) -> Result<CommittedDesign, AppError> {
    assign_field_ids(&mut spec.fields);

    let (design, created) = match existing {
        None => create_design(db, artifacts, &spec, requested_id, tenant_id, actor_email).await?,
        Some(current) => update_design(db, artifacts, &spec, current, actor_email).await?,
    };

    let artifact_url = artifacts.signed_read_url(&design.storage_url, url_ttl)?;
    Ok(CommittedDesign {
        design,
        artifact_url,
        created,
    })
}

/// Artifact key for one committed version. Prior versions' keys are never
/// overwritten because the version counter is never reused.
pub fn artifact_key(design_id: &str, version: i32) -> String {
    format!("{design_id}/v{version}.json")
}

/// Assign identifiers to fields lacking one, continuing past the highest
/// existing id in input order, and derive each field's primitive type.
/// Ids already present are never regenerated.
pub fn assign_field_ids(fields: &mut [FieldSpec]) {
    let mut next_id = fields.iter().filter_map(|f| f.id).max().unwrap_or(0) + 1;
    for field in fields.iter_mut() {
        if field.id.is_none() {
            field.id = Some(next_id);
            next_id += 1;
        }
        field.field_type = primitive_type(&field.datatype).to_string();
    }
}

/// Fixed datatype-to-primitive lookup. Advisory metadata only; an
/// unrecognized datatype maps to empty rather than failing the commit.
fn primitive_type(datatype: &str) -> &'static str {
    match datatype.to_ascii_lowercase().as_str() {
        "number" => "Integer",
        "amount" => "Double",
        "datetime" => "DateTime",
        "date" => "Date",
        _ => "",
    }
}

async fn create_design(
    db: &DatabaseConnection,
    artifacts: &dyn ArtifactStore,
    spec: &DesignSpec,
    requested_id: Option<String>,
    tenant_id: &str,
    actor_email: &str,
) -> Result<(form_design::Model, bool), AppError> {
    let id = requested_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let design_count = form_design::Entity::find()
        .filter(form_design::Column::TenantId.eq(tenant_id))
        .count(db)
        .await?;
    let display_id = i32::try_from(design_count)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| AppError::Validation("Too many designs for tenant".into()))?;

    let storage_url = artifact_key(&id, 1);
    write_artifact(artifacts, &storage_url, spec).await?;

    let now = Utc::now();
    let txn = db.begin().await?;

    let design = form_design::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id.to_string()),
        display_id: Set(display_id),
        name: Set(spec.name.trim().to_string()),
        is_active: Set(true),
        storage_url: Set(storage_url),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        created_by: Set(actor_email.to_string()),
    }
    .insert(&txn)
    .await?;

    // Reconciling against an empty current set is a plain build, so the
    // create and update branches dedup children identically.
    reconcile_designers(&txn, &design.id, &spec.designers).await?;
    reconcile_processors(&txn, &design.id, &spec.processors).await?;
    reconcile_form_states(&txn, &design.id, &spec.form_states).await?;

    let tags = resolve_tags(&txn, &spec.tags).await?;
    link_tags(&txn, &design.id, &tags).await?;

    history::snapshot(&txn, &design, actor_email).await?;
    txn.commit().await?;

    Ok((design, true))
}

async fn update_design(
    db: &DatabaseConnection,
    artifacts: &dyn ArtifactStore,
    spec: &DesignSpec,
    current: form_design::Model,
    actor_email: &str,
) -> Result<(form_design::Model, bool), AppError> {
    let new_version = current
        .version
        .checked_add(1)
        .ok_or_else(|| AppError::Validation("Version overflow".into()))?;
    let storage_url = artifact_key(&current.id, new_version);

    write_artifact(artifacts, &storage_url, spec).await?;

    let now = Utc::now();
    let txn = db.begin().await?;

    // Optimistic concurrency: the increment only lands while the stored
    // version still equals the one read. A lost race leaves the freshly
    // written artifact orphaned.
    let result = form_design::Entity::update_many()
        .col_expr(
            form_design::Column::Name,
            Expr::value(spec.name.trim().to_string()),
        )
        .col_expr(
            form_design::Column::StorageUrl,
            Expr::value(storage_url.clone()),
        )
        .col_expr(form_design::Column::Version, Expr::value(new_version))
        .col_expr(form_design::Column::UpdatedAt, Expr::value(now))
        .filter(form_design::Column::Id.eq(current.id.clone()))
        .filter(form_design::Column::Version.eq(current.version))
        .exec(&txn)
        .await?;
    if result.rows_affected != 1 {
        return Err(AppError::Conflict(format!(
            "Form design '{}' was modified concurrently (expected version {})",
            current.id, current.version
        )));
    }

    reconcile_designers(&txn, &current.id, &spec.designers).await?;
    reconcile_processors(&txn, &current.id, &spec.processors).await?;
    reconcile_form_states(&txn, &current.id, &spec.form_states).await?;

    // Tags are cleared and rebuilt every update rather than diffed.
    form_design_tag::Entity::delete_many()
        .filter(form_design_tag::Column::FormDesignId.eq(current.id.clone()))
        .exec(&txn)
        .await?;
    let tags = resolve_tags(&txn, &spec.tags).await?;
    link_tags(&txn, &current.id, &tags).await?;

    let design = form_design::Entity::find_by_id(current.id.clone())
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("form_design missing after update".into()))?;

    history::snapshot(&txn, &design, actor_email).await?;
    txn.commit().await?;

    Ok((design, false))
}

async fn write_artifact(
    artifacts: &dyn ArtifactStore,
    key: &str,
    spec: &DesignSpec,
) -> Result<(), AppError> {
    let bytes = serde_json::to_vec(spec)?;
    artifacts.write_bytes(key, &bytes).await?;
    Ok(())
}

/// Diff the current designer set against the requested one by email.
/// Unchanged members keep their rows (and row ids) untouched.
async fn reconcile_designers<C: ConnectionTrait>(
    conn: &C,
    design_id: &str,
    desired: &[String],
) -> Result<(), AppError> {
    let desired_set: HashSet<String> = desired
        .iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();

    let current = designer::Entity::find()
        .filter(designer::Column::FormDesignId.eq(design_id))
        .all(conn)
        .await?;
    let current_set: HashSet<String> = current.iter().map(|d| d.email.clone()).collect();

    let stale_ids: Vec<i32> = current
        .iter()
        .filter(|d| !desired_set.contains(&d.email))
        .map(|d| d.id)
        .collect();
    if !stale_ids.is_empty() {
        designer::Entity::delete_many()
            .filter(designer::Column::Id.is_in(stale_ids))
            .exec(conn)
            .await?;
    }

    let missing: Vec<designer::ActiveModel> = desired_set
        .iter()
        .filter(|e| !current_set.contains(*e))
        .map(|email| designer::ActiveModel {
            form_design_id: Set(design_id.to_string()),
            email: Set(email.clone()),
            ..Default::default()
        })
        .collect();
    if !missing.is_empty() {
        designer::Entity::insert_many(missing).exec(conn).await?;
    }

    Ok(())
}

async fn reconcile_processors<C: ConnectionTrait>(
    conn: &C,
    design_id: &str,
    desired: &[String],
) -> Result<(), AppError> {
    let desired_set: HashSet<String> = desired
        .iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();

    let current = processor::Entity::find()
        .filter(processor::Column::FormDesignId.eq(design_id))
        .all(conn)
        .await?;
    let current_set: HashSet<String> = current.iter().map(|p| p.email.clone()).collect();

    let stale_ids: Vec<i32> = current
        .iter()
        .filter(|p| !desired_set.contains(&p.email))
        .map(|p| p.id)
        .collect();
    if !stale_ids.is_empty() {
        processor::Entity::delete_many()
            .filter(processor::Column::Id.is_in(stale_ids))
            .exec(conn)
            .await?;
    }

    let missing: Vec<processor::ActiveModel> = desired_set
        .iter()
        .filter(|e| !current_set.contains(*e))
        .map(|email| processor::ActiveModel {
            form_design_id: Set(design_id.to_string()),
            email: Set(email.clone()),
            ..Default::default()
        })
        .collect();
    if !missing.is_empty() {
        processor::Entity::insert_many(missing).exec(conn).await?;
    }

    Ok(())
}

/// Form states diff by case-folded `"{label}|{value}"`.
fn state_key(label: &str, value: &str) -> String {
    format!("{label}|{value}").to_lowercase()
}

async fn reconcile_form_states<C: ConnectionTrait>(
    conn: &C,
    design_id: &str,
    desired: &[FormStateSpec],
) -> Result<(), AppError> {
    let mut desired_by_key: HashMap<String, &FormStateSpec> = HashMap::new();
    for state in desired {
        desired_by_key.insert(state_key(&state.label, &state.value), state);
    }

    let current = form_state::Entity::find()
        .filter(form_state::Column::FormDesignId.eq(design_id))
        .all(conn)
        .await?;
    let current_keys: HashSet<String> = current
        .iter()
        .map(|s| state_key(&s.label, &s.value))
        .collect();

    let stale_ids: Vec<i32> = current
        .iter()
        .filter(|s| !desired_by_key.contains_key(&state_key(&s.label, &s.value)))
        .map(|s| s.id)
        .collect();
    if !stale_ids.is_empty() {
        form_state::Entity::delete_many()
            .filter(form_state::Column::Id.is_in(stale_ids))
            .exec(conn)
            .await?;
    }

    let missing: Vec<form_state::ActiveModel> = desired_by_key
        .iter()
        .filter(|(key, _)| !current_keys.contains(*key))
        .map(|(_, state)| form_state::ActiveModel {
            form_design_id: Set(design_id.to_string()),
            label: Set(state.label.clone()),
            value: Set(state.value.clone()),
            ..Default::default()
        })
        .collect();
    if !missing.is_empty() {
        form_state::Entity::insert_many(missing).exec(conn).await?;
    }

    Ok(())
}

/// Resolve requested tag names against the shared tag table.
///
/// Names are trimmed and folded case-insensitively (first spelling wins);
/// unknown names are batch-inserted. The returned set is the design's tag
/// membership for this commit.
pub async fn resolve_tags<C: ConnectionTrait>(
    conn: &C,
    names: &[String],
) -> Result<Vec<tag::Model>, AppError> {
    let mut requested: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for name in names {
        let trimmed = name.trim();
        if !trimmed.is_empty() && seen.insert(trimmed.to_lowercase()) {
            requested.push(trimmed.to_string());
        }
    }
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let lowered: Vec<String> = requested.iter().map(|n| n.to_lowercase()).collect();
    let existing = tag::Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(tag::Column::Name))).is_in(lowered.clone()))
        .all(conn)
        .await?;
    let existing_keys: HashSet<String> = existing.iter().map(|t| t.name.to_lowercase()).collect();

    let new_tags: Vec<tag::ActiveModel> = requested
        .iter()
        .filter(|n| !existing_keys.contains(&n.to_lowercase()))
        .map(|name| tag::ActiveModel {
            name: Set(name.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .collect();
    if !new_tags.is_empty() {
        tag::Entity::insert_many(new_tags).exec(conn).await?;
    }

    let members = tag::Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(tag::Column::Name))).is_in(lowered))
        .all(conn)
        .await?;
    Ok(members)
}

async fn link_tags<C: ConnectionTrait>(
    conn: &C,
    design_id: &str,
    tags: &[tag::Model],
) -> Result<(), AppError> {
    let links: Vec<form_design_tag::ActiveModel> = tags
        .iter()
        .map(|t| form_design_tag::ActiveModel {
            form_design_id: Set(design_id.to_string()),
            tag_id: Set(t.id),
        })
        .collect();
    if !links.is_empty() {
        form_design_tag::Entity::insert_many(links).exec(conn).await?;
    }
    Ok(())
}
