use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Input kinds a template field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
    Checkbox,
    Radio,
    File,
    Textarea,
    Email,
    Password,
}

impl FieldType {
    /// Whether submitted values for this field are file references that live
    /// outside the instance's JSON data.
    pub fn holds_file(&self) -> bool {
        match self {
            FieldType::File => true,
            FieldType::Text
            | FieldType::Number
            | FieldType::Date
            | FieldType::Select
            | FieldType::Checkbox
            | FieldType::Radio
            | FieldType::Textarea
            | FieldType::Email
            | FieldType::Password => false,
        }
    }

    pub fn requires_options(&self) -> bool {
        match self {
            FieldType::Select | FieldType::Radio => true,
            FieldType::Text
            | FieldType::Number
            | FieldType::Date
            | FieldType::Checkbox
            | FieldType::File
            | FieldType::Textarea
            | FieldType::Email
            | FieldType::Password => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
pub struct FieldOption {
    /// String or number.
    #[schema(value_type = Object)]
    pub value: Value,
    #[validate(length(min = 1, max = 100))]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
}

/// One entry of a template's `structureDefinition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_field_options"))]
pub struct FieldDefinition {
    #[validate(length(min = 1))]
    pub id: String,
    pub order: u32,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub validations: Option<FieldValidations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub default_value: Option<Value>,
}

fn validate_field_options(field: &FieldDefinition) -> Result<(), ValidationError> {
    if field.field_type.requires_options() {
        match &field.options {
            Some(options) if !options.is_empty() => {}
            _ => {
                let mut err = ValidationError::new("options_required");
                err.message = Some(
                    format!(
                        "Field '{}' of type select/radio needs at least one option",
                        field.name
                    )
                    .into(),
                );
                return Err(err);
            }
        }
    }

    if let Some(options) = &field.options
        && options
            .iter()
            .any(|o| !(o.value.is_string() || o.value.is_number()))
    {
        let mut err = ValidationError::new("option_value");
        err.message = Some(
            format!(
                "Option values of field '{}' must be strings or numbers",
                field.name
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// A file that was uploaded beforehand and is now referenced by a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub storage_key: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

impl FileReference {
    /// Reads a fully-resolved reference out of submitted form data.
    ///
    /// Anything that is not an object carrying a non-empty `storageKey` and
    /// `filename` yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let reference: FileReference = serde_json::from_value(value.clone()).ok()?;
        if reference.storage_key.is_empty() || reference.filename.is_empty() {
            return None;
        }
        Some(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(value: Value) -> FieldDefinition {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_field_definition_from_json() {
        let def = field(json!({
            "id": "f1",
            "order": 0,
            "name": "title",
            "label": "Title",
            "type": "text",
            "required": true,
            "validations": { "maxLength": 20 }
        }));
        assert_eq!(def.field_type, FieldType::Text);
        assert_eq!(def.validations.unwrap().max_length, Some(20));
        assert!(def.options.is_none());
    }

    #[test]
    fn test_unknown_field_type_is_rejected() {
        let res = serde_json::from_value::<FieldDefinition>(json!({
            "id": "f1", "order": 0, "name": "x", "label": "X",
            "type": "colour", "required": false
        }));
        assert!(res.is_err());
    }

    #[test]
    fn test_select_without_options_fails_validation() {
        let def = field(json!({
            "id": "f1", "order": 0, "name": "choice", "label": "Choice",
            "type": "select", "required": false, "options": []
        }));
        assert!(def.validate().is_err());

        let def = field(json!({
            "id": "f1", "order": 0, "name": "choice", "label": "Choice",
            "type": "radio", "required": false,
            "options": [{ "value": 1, "label": "One" }, { "value": "b", "label": "B" }]
        }));
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_option_value_must_be_scalar() {
        let def = field(json!({
            "id": "f1", "order": 0, "name": "choice", "label": "Choice",
            "type": "select", "required": false,
            "options": [{ "value": { "nested": true }, "label": "Bad" }]
        }));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_only_file_type_holds_files() {
        assert!(FieldType::File.holds_file());
        assert!(!FieldType::Textarea.holds_file());
    }

    #[test]
    fn test_file_reference_from_value() {
        let reference =
            FileReference::from_value(&json!({ "storageKey": "k", "filename": "f" })).unwrap();
        assert_eq!(reference.storage_key, "k");
        assert_eq!(reference.mime_type, None);

        assert!(FileReference::from_value(&json!("plain")).is_none());
        assert!(FileReference::from_value(&json!({ "storageKey": "", "filename": "f" })).is_none());
        assert!(FileReference::from_value(&json!({ "filename": "f" })).is_none());
    }
}
