//! Checks submitted form data against a template's field definitions and
//! splits file references away from the scalar values.

use crate::api::error::AppError;
use crate::models::{FieldDefinition, FileReference};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Submitted data split by declared field type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PartitionedData {
    /// Everything that is stored inline in the instance's JSON data.
    pub scalar: Map<String, Value>,
    /// File-typed fields carrying a resolved upload reference, keyed by field name.
    pub files: BTreeMap<String, FileReference>,
}

/// Decodes a template's stored structure. `None` means no structure has been
/// attached yet.
pub fn parse_structure(raw: Option<&Value>) -> Result<Option<Vec<FieldDefinition>>, AppError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| AppError::Internal(format!("Stored template structure is corrupt: {}", e))),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Every required non-file field must be present with a value that is
/// neither null nor the empty string. File fields are checked by whoever
/// resolves the uploads, not here.
pub fn check_required_fields(
    structure: &[FieldDefinition],
    data: &Map<String, Value>,
) -> Result<(), AppError> {
    for field in structure
        .iter()
        .filter(|f| f.required && !f.field_type.holds_file())
    {
        if is_blank(data.get(&field.name)) {
            return Err(AppError::BadRequest(format!(
                "Required field '{}' ({}) is missing.",
                field.label, field.name
            )));
        }
    }
    Ok(())
}

pub fn file_field_names(structure: &[FieldDefinition]) -> HashSet<&str> {
    structure
        .iter()
        .filter(|f| f.field_type.holds_file())
        .map(|f| f.name.as_str())
        .collect()
}

/// Moves file references out of `data`. A file field whose value is not a
/// resolved reference stays in the scalar mapping untouched.
pub fn partition(structure: &[FieldDefinition], data: Map<String, Value>) -> PartitionedData {
    let file_fields = file_field_names(structure);

    let mut out = PartitionedData::default();
    for (key, value) in data {
        if file_fields.contains(key.as_str())
            && let Some(reference) = FileReference::from_value(&value)
        {
            out.files.insert(key, reference);
            continue;
        }
        out.scalar.insert(key, value);
    }
    out
}

/// Field ids and names must each be unique within one structure.
pub fn check_unique_fields(fields: &[FieldDefinition]) -> Result<(), AppError> {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Field name '{}' is duplicated in the definition.",
                field.name
            )));
        }
        if !ids.insert(field.id.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Field id '{}' is duplicated in the definition.",
                field.id
            )));
        }
    }
    Ok(())
}
