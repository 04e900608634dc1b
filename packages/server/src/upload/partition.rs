use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::models::design::FieldSpec;

/// A submission payload: per-tab field values plus the form identifier.
///
/// Tabs are navigated by explicit name lookups against the document
/// definition; nothing else in the tree is interpreted.
#[derive(Debug, Clone)]
pub struct SubmissionPayload {
    pub form_id: String,
    pub tabs: Map<String, Value>,
}

/// The two views of a flattened submission.
///
/// The external workflow system indexes documents on scalar/lookup fields
/// only; file content travels as separate binary attachments, never embedded
/// in the index payload.
pub struct Partitioned {
    /// Flattened fields with file entries stripped and `formId` injected.
    pub index_fields: Map<String, Value>,
    /// The same flattening with file payloads retained.
    pub index_fields_with_files: Map<String, Value>,
}

/// Split a submission into index fields and file-bearing fields, driven by
/// the field-type declarations of the document definition.
pub fn partition(payload: &SubmissionPayload, fields: &[FieldSpec]) -> Partitioned {
    // Distinct tab names, in declaration order.
    let mut tabs: Vec<&str> = Vec::new();
    for field in fields {
        if !tabs.contains(&field.tab.as_str()) {
            tabs.push(&field.tab);
        }
    }

    let file_fields: HashSet<&str> = fields
        .iter()
        .filter(|f| f.is_file())
        .map(|f| f.name.as_str())
        .collect();

    let mut with_files = Map::new();
    for tab in tabs {
        if let Some(Value::Object(entries)) = payload.tabs.get(tab) {
            for (name, value) in entries {
                // Last write wins on duplicate field names across tabs.
                with_files.insert(name.clone(), value.clone());
            }
        }
    }

    let mut index_fields = Map::new();
    for (name, value) in &with_files {
        if !file_fields.contains(name.as_str()) {
            index_fields.insert(name.clone(), value.clone());
        }
    }
    // The external system indexes by form regardless of tab membership.
    index_fields.insert(
        "formId".to_string(),
        Value::String(payload.form_id.clone()),
    );

    Partitioned {
        index_fields,
        index_fields_with_files: with_files,
    }
}
