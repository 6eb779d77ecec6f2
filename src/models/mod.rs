pub mod form_field;

pub use form_field::{FieldDefinition, FieldOption, FieldType, FieldValidations, FileReference};
